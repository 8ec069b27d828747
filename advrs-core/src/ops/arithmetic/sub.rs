use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::arithmetic::neg_op;
use crate::tensor::Tensor;

/// Backward pass for `a - b`: `grad_a = grad`, `grad_b = -grad`, both reduced over broadcasting.
#[derive(Debug)]
struct SubBackward {
    a: Tensor,
    b: Tensor,
    a_shape: Vec<usize>,
    b_shape: Vec<usize>,
}

impl BackwardOp for SubBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let grad_a = grad_output.reduce_to_shape(&self.a_shape)?;
        let grad_b = neg_op(&grad_output.detach())?.reduce_to_shape(&self.b_shape)?;
        Ok(vec![grad_a, grad_b])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }
}

/// Performs element-wise subtraction `a - b` with broadcasting.
pub fn sub_op(a: &Tensor, b: &Tensor) -> Result<Tensor, AdvrsError> {
    let a_shape = a.shape();
    let b_shape = b.shape();
    crate::ops::apply_binary_op(
        a,
        b,
        |x, y| x - y,
        |x, y| x - y,
        move |a, b| Arc::new(SubBackward { a, b, a_shape, b_shape }),
        "sub_op",
    )
}
