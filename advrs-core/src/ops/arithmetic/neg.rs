use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::tensor::Tensor;

#[derive(Debug)]
struct NegBackward {
    a: Tensor,
}

impl BackwardOp for NegBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        Ok(vec![neg_op(&grad_output.detach())?])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Computes `-a` element-wise.
pub fn neg_op(a: &Tensor) -> Result<Tensor, AdvrsError> {
    crate::ops::apply_unary_op(a, |x| -x, |x| -x, |a| Arc::new(NegBackward { a }))
}
