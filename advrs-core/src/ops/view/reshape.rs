use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::tensor::Tensor;

#[derive(Debug)]
struct ReshapeBackward {
    a: Tensor,
    input_shape: Vec<usize>,
}

impl BackwardOp for ReshapeBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        Ok(vec![Tensor::from_buffer(grad_output.buffer(), self.input_shape.clone())?])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Returns a tensor with the same elements in `new_shape`. The buffer is shared.
///
/// # Errors
/// `ShapeMismatch` if `new_shape` holds a different number of elements.
pub fn reshape_op(a: &Tensor, new_shape: Vec<usize>) -> Result<Tensor, AdvrsError> {
    let input_shape = a.shape();
    let new_numel: usize = new_shape.iter().product();
    if new_numel != a.numel() {
        return Err(AdvrsError::ShapeMismatch {
            expected: input_shape,
            actual: new_shape,
            operation: "reshape_op".to_string(),
        });
    }
    let output = Tensor::from_buffer(a.buffer(), new_shape)?;
    crate::ops::attach_grad_fn(&output, a.requires_grad(), || {
        Arc::new(ReshapeBackward { a: a.clone(), input_shape })
    });
    Ok(output)
}
