//! Adapter for `Sequential` layer stacks.
//!
//! The layer engine's gradient primitives only differentiate the loss of the first
//! example, so gradient operations accept batches of exactly one.

use advrs_core::engine;
use advrs_core::nn::{Module, Sequential};
use advrs_core::ops::loss::sparse_cross_entropy_op;
use advrs_core::ops::view::select_op;
use advrs_core::Tensor;
use log::{debug, info, warn};

use crate::base::{
    check_input, check_labels, check_predictions, check_upstream, class_count,
    cross_entropy_gradient, logits_vjp, ModelBase,
};
use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::model::{add_batch_axis, DifferentiableModel};

/// Wraps a [`Sequential`] network whose output is logits.
#[derive(Debug)]
pub struct LayerModel {
    base: ModelBase,
    network: Sequential,
    input_shape: Vec<usize>,
    num_classes: usize,
}

impl LayerModel {
    pub const DEFAULT_CHANNEL_AXIS: usize = 1;

    /// Wraps `network`, which takes per-example inputs of `input_shape`.
    ///
    /// # Errors
    /// `Configuration` if the network's declared output is not `[batch, classes]`.
    pub fn new(
        network: Sequential,
        input_shape: &[usize],
        config: ModelConfig,
    ) -> Result<Self, ModelError> {
        engine::acquire()?;
        warn!("the layer engine is deprecated; gradient operations are limited to batches of one");

        let mut declared = vec![None];
        declared.extend(input_shape.iter().map(|&d| Some(d)));
        let output = network
            .output_shape(&declared)
            .map_err(|e| {
                ModelError::Configuration(format!("cannot infer network output shape: {}", e))
            })?;
        let num_classes = class_count(&output)?;
        info!("layer model ready: {} layers, {} classes", network.len(), num_classes);

        Ok(LayerModel {
            base: ModelBase::new(config, Self::DEFAULT_CHANNEL_AXIS),
            network,
            input_shape: input_shape.to_vec(),
            num_classes,
        })
    }

    pub fn network(&self) -> &Sequential {
        &self.network
    }

    fn forward(
        &self,
        normalized: &Tensor,
        batch: usize,
        operation: &str,
    ) -> Result<Tensor, ModelError> {
        let logits = self.network.forward(normalized)?;
        check_predictions(&logits, batch, self.num_classes, operation)?;
        Ok(logits)
    }

    fn require_single(&self, n: usize, operation: &str) -> Result<(), ModelError> {
        if n != 1 {
            return Err(ModelError::NotSupported(format!(
                "{} on the layer engine needs a batch of 1, got {}",
                operation, n
            )));
        }
        Ok(())
    }
}

impl DifferentiableModel for LayerModel {
    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn batch_predictions(&self, images: &Tensor) -> Result<Tensor, ModelError> {
        let n = check_input(images, &self.input_shape, "batch_predictions")?;
        debug!("layer batch_predictions on {:?}", images.shape());
        let (normalized, _) = self.base.process_input(images, false)?;
        let logits = self.forward(&normalized, n, "batch_predictions")?;
        Ok(logits.detach())
    }

    fn predictions_and_gradient(
        &self,
        image: &Tensor,
        label: usize,
    ) -> Result<(Tensor, Tensor), ModelError> {
        let batch = add_batch_axis(image)?;
        check_input(&batch, &self.input_shape, "predictions_and_gradient")?;
        check_labels(&[label], 1, self.num_classes, "predictions_and_gradient")?;
        debug!("layer predictions_and_gradient on {:?}, label {}", image.shape(), label);

        let (normalized, scale) = self.base.process_input(&batch, true)?;
        let logits = self.forward(&normalized, 1, "predictions_and_gradient")?;
        let gradient = cross_entropy_gradient(&logits, &normalized, &[label])?;
        let gradient = self.base.process_gradient(&batch, &scale, &gradient)?;
        Ok((select_op(&logits.detach(), 0)?, gradient.reshape(image.shape())?))
    }

    fn batch_gradients(&self, images: &Tensor, labels: &[usize]) -> Result<Tensor, ModelError> {
        let n = check_input(images, &self.input_shape, "batch_gradients")?;
        check_labels(labels, n, self.num_classes, "batch_gradients")?;
        self.require_single(n, "batch_gradients")?;
        debug!("layer batch_gradients on {:?}", images.shape());

        let (normalized, scale) = self.base.process_input(images, true)?;
        let logits = self.forward(&normalized, n, "batch_gradients")?;
        let gradient = cross_entropy_gradient(&logits, &normalized, labels)?;
        self.base.process_gradient(images, &scale, &gradient)
    }

    fn batch_backward(&self, gradients: &Tensor, images: &Tensor) -> Result<Tensor, ModelError> {
        let n = check_input(images, &self.input_shape, "batch_backward")?;
        check_upstream(gradients, n, self.num_classes)?;
        self.require_single(n, "batch_backward")?;
        debug!("layer batch_backward on {:?}", images.shape());

        let (normalized, scale) = self.base.process_input(images, true)?;
        let logits = self.forward(&normalized, n, "batch_backward")?;
        let gradient = logits_vjp(&logits, &normalized, gradients)?;
        self.base.process_gradient(images, &scale, &gradient)
    }

    fn loss(&self, image: &Tensor, label: usize) -> Result<f64, ModelError> {
        let batch = add_batch_axis(image)?;
        check_input(&batch, &self.input_shape, "loss")?;
        check_labels(&[label], 1, self.num_classes, "loss")?;
        let (normalized, _) = self.base.process_input(&batch, false)?;
        let logits = self.forward(&normalized, 1, "loss")?;
        Ok(sparse_cross_entropy_op(&logits, &[label])?.item()?)
    }
}
