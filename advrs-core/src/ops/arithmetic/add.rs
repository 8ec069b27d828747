use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::tensor::Tensor;

/// Backward pass for element-wise addition with broadcasting.
///
/// The output gradient flows unchanged to both inputs, summed over broadcast dimensions.
#[derive(Debug)]
struct AddBackward {
    a: Tensor,
    b: Tensor,
    a_shape: Vec<usize>,
    b_shape: Vec<usize>,
}

impl BackwardOp for AddBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        Ok(vec![
            grad_output.reduce_to_shape(&self.a_shape)?,
            grad_output.reduce_to_shape(&self.b_shape)?,
        ])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }
}

/// Performs element-wise addition `a + b` with broadcasting.
///
/// # Errors
/// `AdvrsError::BroadcastError` if the shapes are not broadcast-compatible.
pub fn add_op(a: &Tensor, b: &Tensor) -> Result<Tensor, AdvrsError> {
    let a_shape = a.shape();
    let b_shape = b.shape();
    crate::ops::apply_binary_op(
        a,
        b,
        |x, y| x + y,
        |x, y| x + y,
        move |a, b| Arc::new(AddBackward { a, b, a_shape, b_shape }),
        "add_op",
    )
}

#[cfg(test)]
#[path = "add_test.rs"]
mod tests;
