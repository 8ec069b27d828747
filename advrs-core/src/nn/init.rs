use rand::Rng;

use crate::error::AdvrsError;
use crate::tensor::{rand_uniform, Tensor};
use crate::types::DType;

/// Uniform initialization in `[-1/sqrt(fan_in), 1/sqrt(fan_in))`.
///
/// This is Kaiming-uniform with `a = sqrt(5)`, the usual default for dense layers.
pub fn kaiming_uniform<R: Rng + ?Sized>(
    shape: &[usize],
    fan_in: usize,
    dtype: DType,
    rng: &mut R,
) -> Result<Tensor, AdvrsError> {
    if fan_in == 0 {
        return Err(AdvrsError::UnsupportedOperation(
            "kaiming_uniform requires fan_in > 0".to_string(),
        ));
    }
    let bound = 1.0 / (fan_in as f64).sqrt();
    rand_uniform(shape, -bound, bound, dtype, rng)
}

#[cfg(test)]
#[path = "init_test.rs"]
mod tests;
