use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::arithmetic::mul_op;
use crate::ops::map_values;
use crate::tensor::Tensor;

/// Backward pass for ReLU: the gradient passes where the input was strictly positive.
#[derive(Debug)]
struct ReluBackward {
    a: Tensor,
}

impl BackwardOp for ReluBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let mask = map_values(
            &self.a.detach(),
            |x| if x > 0.0 { 1.0 } else { 0.0 },
            |x| if x > 0.0 { 1.0 } else { 0.0 },
        )?;
        Ok(vec![mul_op(&grad_output.detach(), &mask)?])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Computes `max(a, 0)` element-wise.
pub fn relu_op(a: &Tensor) -> Result<Tensor, AdvrsError> {
    crate::ops::apply_unary_op(a, |x| x.max(0.0), |x| x.max(0.0), |a| Arc::new(ReluBackward { a }))
}

#[cfg(test)]
#[path = "relu_test.rs"]
mod tests;
