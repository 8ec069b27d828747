use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::tensor::Tensor;

/// Backward pass for `a * b`: `grad_a = grad * b`, `grad_b = grad * a`.
#[derive(Debug)]
struct MulBackward {
    a: Tensor,
    b: Tensor,
    a_shape: Vec<usize>,
    b_shape: Vec<usize>,
}

impl BackwardOp for MulBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let grad = grad_output.detach();
        let grad_a = mul_op(&grad, &self.b.detach())?.reduce_to_shape(&self.a_shape)?;
        let grad_b = mul_op(&grad, &self.a.detach())?.reduce_to_shape(&self.b_shape)?;
        Ok(vec![grad_a, grad_b])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }
}

/// Performs element-wise multiplication `a * b` with broadcasting.
pub fn mul_op(a: &Tensor, b: &Tensor) -> Result<Tensor, AdvrsError> {
    let a_shape = a.shape();
    let b_shape = b.shape();
    crate::ops::apply_binary_op(
        a,
        b,
        |x, y| x * y,
        |x, y| x * y,
        move |a, b| Arc::new(MulBackward { a, b, a_shape, b_shape }),
        "mul_op",
    )
}

#[cfg(test)]
#[path = "mul_test.rs"]
mod tests;
