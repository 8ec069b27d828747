//! Affine input normalization and the matching gradient correction.

use advrs_core::ops::arithmetic::{div_op, mul_op, sub_op};
use advrs_core::tensor::{ones_like, scalar_f64};
use advrs_core::Tensor;

use crate::error::ModelError;

/// Normalization `(x - subtrahend) / divisor`, applied before every forward pass.
///
/// Both parameters broadcast against the raw input. The defaults `(0, 1)` are the
/// identity.
#[derive(Debug, Clone)]
pub struct Preprocessing {
    subtrahend: Tensor,
    divisor: Tensor,
}

impl Preprocessing {
    /// Creates a transform from broadcastable parameter tensors.
    ///
    /// # Errors
    /// `Configuration` if any parameter value is not finite or any divisor is zero.
    pub fn new(subtrahend: Tensor, divisor: Tensor) -> Result<Self, ModelError> {
        if subtrahend.to_f64_vec().iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Configuration(
                "preprocessing subtrahend must be finite".to_string(),
            ));
        }
        if divisor.to_f64_vec().iter().any(|&v| v == 0.0 || !v.is_finite()) {
            return Err(ModelError::Configuration(
                "preprocessing divisor must be finite and non-zero".to_string(),
            ));
        }
        Ok(Preprocessing {
            subtrahend: subtrahend.detach(),
            divisor: divisor.detach(),
        })
    }

    /// Uniform scalar parameters.
    pub fn scalar(subtrahend: f64, divisor: f64) -> Result<Self, ModelError> {
        Self::new(scalar_f64(subtrahend), scalar_f64(divisor))
    }

    pub fn identity() -> Self {
        Preprocessing {
            subtrahend: scalar_f64(0.0),
            divisor: scalar_f64(1.0),
        }
    }

    pub fn subtrahend(&self) -> &Tensor {
        &self.subtrahend
    }

    pub fn divisor(&self) -> &Tensor {
        &self.divisor
    }

    /// Normalizes `raw` and returns the gradient scale `1 / divisor`.
    ///
    /// The result keeps the raw dtype and is detached from any graph `raw` belongs to.
    ///
    /// # Errors
    /// `InvalidShape` if the parameters would broadcast `raw` to a larger shape.
    pub fn apply(&self, raw: &Tensor) -> Result<(Tensor, Tensor), ModelError> {
        let raw = raw.detach();
        let subtrahend = self.subtrahend.to_dtype(raw.dtype())?;
        let divisor = self.divisor.to_dtype(raw.dtype())?;
        let normalized = div_op(&sub_op(&raw, &subtrahend)?, &divisor)?;
        if normalized.shape() != raw.shape() {
            return Err(ModelError::invalid_shape(
                "Preprocessing::apply",
                raw.shape(),
                normalized.shape(),
            ));
        }
        let gradient_scale = div_op(&ones_like(&divisor)?, &divisor)?;
        Ok((normalized, gradient_scale))
    }

    /// Maps a gradient w.r.t. the normalized input back to the raw input.
    ///
    /// # Errors
    /// `InvalidShape` if the product does not keep the gradient's shape.
    pub fn unapply_gradient(
        gradient_scale: &Tensor,
        gradient: &Tensor,
    ) -> Result<Tensor, ModelError> {
        let scale = gradient_scale.to_dtype(gradient.dtype())?;
        let raw_gradient = mul_op(&gradient.detach(), &scale)?;
        if raw_gradient.shape() != gradient.shape() {
            return Err(ModelError::invalid_shape(
                "Preprocessing::unapply_gradient",
                gradient.shape(),
                raw_gradient.shape(),
            ));
        }
        Ok(raw_gradient)
    }
}

impl Default for Preprocessing {
    fn default() -> Self {
        Self::identity()
    }
}
