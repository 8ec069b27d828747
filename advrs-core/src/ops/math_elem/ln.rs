use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::arithmetic::div_op;
use crate::tensor::Tensor;

/// Backward pass for the natural logarithm: `grad / a`.
#[derive(Debug)]
struct LnBackward {
    a: Tensor,
}

impl BackwardOp for LnBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        Ok(vec![div_op(&grad_output.detach(), &self.a.detach())?])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Computes the element-wise natural logarithm.
///
/// Non-positive inputs produce NaN or -inf; the gradient at 0 is infinite.
pub fn ln_op(a: &Tensor) -> Result<Tensor, AdvrsError> {
    crate::ops::apply_unary_op(a, |x| x.ln(), |x| x.ln(), |a| Arc::new(LnBackward { a }))
}

#[cfg(test)]
#[path = "ln_test.rs"]
mod tests;
