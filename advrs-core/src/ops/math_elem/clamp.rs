use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::arithmetic::mul_op;
use crate::ops::map_values;
use crate::tensor::Tensor;

/// Backward pass for `clamp`: the gradient passes where `min <= a <= max`, zero elsewhere.
#[derive(Debug)]
struct ClampBackward {
    a: Tensor,
    min: f64,
    max: f64,
}

impl BackwardOp for ClampBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let (min, max) = (self.min, self.max);
        let (min32, max32) = (min as f32, max as f32);
        let mask = map_values(
            &self.a.detach(),
            |x| if x >= min32 && x <= max32 { 1.0 } else { 0.0 },
            |x| if x >= min && x <= max { 1.0 } else { 0.0 },
        )?;
        Ok(vec![mul_op(&grad_output.detach(), &mask)?])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Clamps every element into `[min, max]`.
///
/// # Errors
/// `AdvrsError::UnsupportedOperation` if `min > max` or either bound is NaN.
pub fn clamp_op(a: &Tensor, min: f64, max: f64) -> Result<Tensor, AdvrsError> {
    if !(min <= max) {
        return Err(AdvrsError::UnsupportedOperation(format!(
            "clamp_op requires min <= max, got [{}, {}]",
            min, max
        )));
    }
    let (min32, max32) = (min as f32, max as f32);
    crate::ops::apply_unary_op(
        a,
        move |x| x.max(min32).min(max32),
        move |x| x.max(min).min(max),
        move |a| Arc::new(ClampBackward { a, min, max }),
    )
}
