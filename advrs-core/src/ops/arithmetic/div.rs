use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::arithmetic::{mul_op, neg_op};
use crate::tensor::Tensor;

/// Backward pass for `a / b`.
///
/// `grad_a = grad / b` and `grad_b = -grad * a / b^2`.
#[derive(Debug)]
struct DivBackward {
    a: Tensor,
    b: Tensor,
    a_shape: Vec<usize>,
    b_shape: Vec<usize>,
}

impl BackwardOp for DivBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let grad = grad_output.detach();
        let a = self.a.detach();
        let b = self.b.detach();
        let grad_a = div_op(&grad, &b)?.reduce_to_shape(&self.a_shape)?;
        let b_squared = mul_op(&b, &b)?;
        let grad_b =
            neg_op(&div_op(&mul_op(&grad, &a)?, &b_squared)?)?.reduce_to_shape(&self.b_shape)?;
        Ok(vec![grad_a, grad_b])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }
}

/// Performs element-wise division `a / b` with broadcasting.
///
/// Division by zero follows IEEE semantics (inf or NaN); callers validate divisors.
pub fn div_op(a: &Tensor, b: &Tensor) -> Result<Tensor, AdvrsError> {
    let a_shape = a.shape();
    let b_shape = b.shape();
    crate::ops::apply_binary_op(
        a,
        b,
        |x, y| x / y,
        |x, y| x / y,
        move |a, b| Arc::new(DivBackward { a, b, a_shape, b_shape }),
        "div_op",
    )
}

#[cfg(test)]
#[path = "div_test.rs"]
mod tests;
