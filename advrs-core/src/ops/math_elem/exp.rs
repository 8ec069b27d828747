use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::arithmetic::mul_op;
use crate::tensor::Tensor;

/// Backward pass for `exp`: `grad * exp(a)`.
#[derive(Debug)]
struct ExpBackward {
    a: Tensor,
}

impl BackwardOp for ExpBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let exp_a = exp_op(&self.a.detach())?;
        Ok(vec![mul_op(&grad_output.detach(), &exp_a)?])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Computes `e^a` element-wise.
pub fn exp_op(a: &Tensor) -> Result<Tensor, AdvrsError> {
    crate::ops::apply_unary_op(a, |x| x.exp(), |x| x.exp(), |a| Arc::new(ExpBackward { a }))
}
