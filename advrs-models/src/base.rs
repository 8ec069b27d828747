//! Configuration and checks shared by the adapters.

use advrs_core::autograd::grad;
use advrs_core::ops::loss::sparse_cross_entropy_op;
use advrs_core::ops::reduction::sum_op;
use advrs_core::{AdvrsError, Tensor};
use log::debug;

use crate::bounds::Bounds;
use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::preprocessing::Preprocessing;

/// Resolved adapter configuration.
#[derive(Debug, Clone)]
pub struct ModelBase {
    bounds: Bounds,
    channel_axis: usize,
    preprocessing: Preprocessing,
}

impl ModelBase {
    pub fn new(config: ModelConfig, default_channel_axis: usize) -> Self {
        ModelBase {
            bounds: config.bounds,
            channel_axis: config.channel_axis.unwrap_or(default_channel_axis),
            preprocessing: config.preprocessing,
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn channel_axis(&self) -> usize {
        self.channel_axis
    }

    pub fn preprocessing(&self) -> &Preprocessing {
        &self.preprocessing
    }

    /// Whether `input` has an axis at the configured channel position.
    pub fn has_channel_axis(&self, input: &Tensor) -> bool {
        self.channel_axis < input.rank()
    }

    /// Normalizes `raw`. With `track` the result is a leaf that gradients flow to.
    pub(crate) fn process_input(
        &self,
        raw: &Tensor,
        track: bool,
    ) -> Result<(Tensor, Tensor), ModelError> {
        if !self.has_channel_axis(raw) {
            debug!(
                "channel axis {} does not exist in input of shape {:?}",
                self.channel_axis,
                raw.shape()
            );
        }
        let (normalized, scale) = self.preprocessing.apply(raw)?;
        if track {
            normalized.set_requires_grad(true)?;
        }
        Ok((normalized, scale))
    }

    /// Maps a normalized-space gradient back to `raw`, enforcing its shape and dtype.
    pub(crate) fn process_gradient(
        &self,
        raw: &Tensor,
        scale: &Tensor,
        gradient: &Tensor,
    ) -> Result<Tensor, ModelError> {
        let result = Preprocessing::unapply_gradient(scale, gradient)?.to_dtype(raw.dtype())?;
        if result.shape() != raw.shape() {
            return Err(ModelError::invalid_shape("gradient", raw.shape(), result.shape()));
        }
        Ok(result)
    }
}

/// Batch size of `images`, which must have a batch axis.
pub(crate) fn batch_size(images: &Tensor, operation: &str) -> Result<usize, ModelError> {
    images
        .shape()
        .first()
        .copied()
        .ok_or_else(|| ModelError::invalid_shape(operation, vec![1], images.shape()))
}

/// Checks `images` is `[N, ..input_shape]` and returns `N`.
pub(crate) fn check_input(
    images: &Tensor,
    input_shape: &[usize],
    operation: &str,
) -> Result<usize, ModelError> {
    let shape = images.shape();
    let n = batch_size(images, operation)?;
    if shape[1..] != *input_shape {
        let mut expected = vec![n];
        expected.extend_from_slice(input_shape);
        return Err(ModelError::invalid_shape(operation, expected, shape));
    }
    Ok(n)
}

pub(crate) fn check_labels(
    labels: &[usize],
    batch: usize,
    num_classes: usize,
    operation: &str,
) -> Result<(), ModelError> {
    if labels.len() != batch {
        return Err(ModelError::invalid_shape(operation, vec![batch], vec![labels.len()]));
    }
    if let Some(&label) = labels.iter().find(|&&l| l >= num_classes) {
        return Err(ModelError::invalid_shape(operation, vec![num_classes], vec![label]));
    }
    Ok(())
}

/// Upstream gradients must be `[N, C]`.
pub(crate) fn check_upstream(
    gradients: &Tensor,
    batch: usize,
    num_classes: usize,
) -> Result<(), ModelError> {
    if gradients.shape() != [batch, num_classes] {
        return Err(ModelError::invalid_shape(
            "batch_backward",
            vec![batch, num_classes],
            gradients.shape(),
        ));
    }
    Ok(())
}

pub(crate) fn check_predictions(
    logits: &Tensor,
    batch: usize,
    num_classes: usize,
    operation: &str,
) -> Result<(), ModelError> {
    if logits.shape() != [batch, num_classes] {
        return Err(ModelError::invalid_shape(operation, vec![batch, num_classes], logits.shape()));
    }
    Ok(())
}

/// Class count from a declared `[batch, classes]` output shape.
pub(crate) fn class_count(declared: &[Option<usize>]) -> Result<usize, ModelError> {
    match declared {
        [_, Some(classes)] if *classes > 0 => Ok(*classes),
        _ => Err(ModelError::Configuration(format!(
            "model output must be declared as [batch, classes], got {:?}",
            declared
        ))),
    }
}

/// Gradient w.r.t. `normalized` of the cross-entropy summed over the batch.
pub(crate) fn cross_entropy_gradient(
    logits: &Tensor,
    normalized: &Tensor,
    labels: &[usize],
) -> Result<Tensor, ModelError> {
    let loss = sum_op(&sparse_cross_entropy_op(logits, labels)?, None, false)?;
    first(grad(&loss, None, &[normalized.clone()])?)
}

/// Gradient w.r.t. `normalized` of `sum(logits * upstream)`.
pub(crate) fn logits_vjp(
    logits: &Tensor,
    normalized: &Tensor,
    upstream: &Tensor,
) -> Result<Tensor, ModelError> {
    let seed = upstream.to_dtype(logits.dtype())?;
    first(grad(logits, Some(&seed), &[normalized.clone()])?)
}

fn first(mut grads: Vec<Tensor>) -> Result<Tensor, ModelError> {
    grads
        .pop()
        .ok_or_else(|| AdvrsError::InternalError("engine returned no gradient".to_string()).into())
}
