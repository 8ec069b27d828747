//! Adapter for arbitrary [`Module`]s differentiated on the autograd tape.

use advrs_core::engine;
use advrs_core::nn::Module;
use advrs_core::ops::loss::sparse_cross_entropy_op;
use advrs_core::ops::view::select_op;
use advrs_core::Tensor;
use log::{debug, info};

use crate::base::{
    batch_size, check_labels, check_predictions, check_upstream, cross_entropy_gradient,
    logits_vjp, ModelBase,
};
use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::model::{add_batch_axis, DifferentiableModel};

/// Wraps any module whose forward pass returns logits `[N, C]`.
///
/// The module declares no shapes, so the class count is given explicitly and checked
/// against every forward pass.
#[derive(Debug)]
pub struct TapeModel<M: Module> {
    base: ModelBase,
    module: M,
    num_classes: usize,
}

impl<M: Module> TapeModel<M> {
    pub const DEFAULT_CHANNEL_AXIS: usize = 1;

    /// # Errors
    /// `Configuration` if `num_classes` is zero.
    pub fn new(module: M, num_classes: usize, config: ModelConfig) -> Result<Self, ModelError> {
        engine::acquire()?;
        if num_classes == 0 {
            return Err(ModelError::Configuration("num_classes must be positive".to_string()));
        }
        info!("tape model ready: {} classes", num_classes);
        Ok(TapeModel {
            base: ModelBase::new(config, Self::DEFAULT_CHANNEL_AXIS),
            module,
            num_classes,
        })
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    fn forward(
        &self,
        normalized: &Tensor,
        batch: usize,
        operation: &str,
    ) -> Result<Tensor, ModelError> {
        let logits = self.module.forward(normalized)?;
        check_predictions(&logits, batch, self.num_classes, operation)?;
        Ok(logits)
    }
}

impl<M: Module> DifferentiableModel for TapeModel<M> {
    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn batch_predictions(&self, images: &Tensor) -> Result<Tensor, ModelError> {
        let n = batch_size(images, "batch_predictions")?;
        debug!("tape batch_predictions on {:?}", images.shape());
        let (normalized, _) = self.base.process_input(images, false)?;
        Ok(self.forward(&normalized, n, "batch_predictions")?.detach())
    }

    fn predictions_and_gradient(
        &self,
        image: &Tensor,
        label: usize,
    ) -> Result<(Tensor, Tensor), ModelError> {
        let batch = add_batch_axis(image)?;
        check_labels(&[label], 1, self.num_classes, "predictions_and_gradient")?;
        debug!("tape predictions_and_gradient on {:?}, label {}", image.shape(), label);

        let (normalized, scale) = self.base.process_input(&batch, true)?;
        let logits = self.forward(&normalized, 1, "predictions_and_gradient")?;
        let gradient = cross_entropy_gradient(&logits, &normalized, &[label])?;
        let gradient = self.base.process_gradient(&batch, &scale, &gradient)?;
        Ok((select_op(&logits.detach(), 0)?, gradient.reshape(image.shape())?))
    }

    fn batch_gradients(&self, images: &Tensor, labels: &[usize]) -> Result<Tensor, ModelError> {
        let n = batch_size(images, "batch_gradients")?;
        check_labels(labels, n, self.num_classes, "batch_gradients")?;
        debug!("tape batch_gradients on {:?}", images.shape());

        let (normalized, scale) = self.base.process_input(images, true)?;
        let logits = self.forward(&normalized, n, "batch_gradients")?;
        let gradient = cross_entropy_gradient(&logits, &normalized, labels)?;
        self.base.process_gradient(images, &scale, &gradient)
    }

    fn batch_backward(&self, gradients: &Tensor, images: &Tensor) -> Result<Tensor, ModelError> {
        let n = batch_size(images, "batch_backward")?;
        check_upstream(gradients, n, self.num_classes)?;
        debug!("tape batch_backward on {:?}", images.shape());

        let (normalized, scale) = self.base.process_input(images, true)?;
        let logits = self.forward(&normalized, n, "batch_backward")?;
        let gradient = logits_vjp(&logits, &normalized, gradients)?;
        self.base.process_gradient(images, &scale, &gradient)
    }

    fn loss(&self, image: &Tensor, label: usize) -> Result<f64, ModelError> {
        let batch = add_batch_axis(image)?;
        check_labels(&[label], 1, self.num_classes, "loss")?;
        let (normalized, _) = self.base.process_input(&batch, false)?;
        let logits = self.forward(&normalized, 1, "loss")?;
        Ok(sparse_cross_entropy_op(&logits, &[label])?.item()?)
    }
}
