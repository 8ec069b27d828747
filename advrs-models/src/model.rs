use advrs_core::ops::view::select_op;
use advrs_core::Tensor;

use crate::base::ModelBase;
use crate::bounds::Bounds;
use crate::error::ModelError;
use crate::preprocessing::Preprocessing;

/// A classifier that exposes logits and input gradients to attack algorithms.
///
/// Every gradient returned is with respect to the raw (unpreprocessed) input and has
/// that input's shape and dtype. Predictions are always logits.
pub trait DifferentiableModel: Send + Sync {
    /// Shared configuration resolved at construction.
    fn base(&self) -> &ModelBase;

    /// Number of output classes, fixed at construction.
    fn num_classes(&self) -> usize;

    /// Logits `[N, C]` for a batch `[N, ...]`.
    fn batch_predictions(&self, images: &Tensor) -> Result<Tensor, ModelError>;

    /// Logits `[C]` and the cross-entropy gradient at `label` for one image, from a
    /// single forward and backward pass.
    fn predictions_and_gradient(
        &self,
        image: &Tensor,
        label: usize,
    ) -> Result<(Tensor, Tensor), ModelError>;

    /// Gradients of the summed cross-entropy over a batch.
    fn batch_gradients(&self, images: &Tensor, labels: &[usize]) -> Result<Tensor, ModelError>;

    /// Vector-Jacobian product of the logits with an upstream gradient `[N, C]`.
    fn batch_backward(&self, gradients: &Tensor, images: &Tensor) -> Result<Tensor, ModelError>;

    /// Cross-entropy loss of one image at `label`.
    fn loss(&self, image: &Tensor, label: usize) -> Result<f64, ModelError>;

    fn bounds(&self) -> Bounds {
        self.base().bounds()
    }

    fn channel_axis(&self) -> usize {
        self.base().channel_axis()
    }

    fn preprocessing(&self) -> &Preprocessing {
        self.base().preprocessing()
    }

    /// Logits `[C]` for a single image.
    fn predictions(&self, image: &Tensor) -> Result<Tensor, ModelError> {
        let batch = self.batch_predictions(&add_batch_axis(image)?)?;
        Ok(select_op(&batch, 0)?)
    }

    /// Cross-entropy gradient at `label` for a single image.
    fn gradient(&self, image: &Tensor, label: usize) -> Result<Tensor, ModelError> {
        let batch = self.batch_gradients(&add_batch_axis(image)?, &[label])?;
        Ok(batch.reshape(image.shape())?)
    }

    /// Vector-Jacobian product for a single image and upstream gradient `[C]`.
    fn backward(&self, gradient: &Tensor, image: &Tensor) -> Result<Tensor, ModelError> {
        if gradient.rank() != 1 {
            return Err(ModelError::invalid_shape(
                "backward",
                vec![self.num_classes()],
                gradient.shape(),
            ));
        }
        let upstream = add_batch_axis(gradient)?;
        let batch = self.batch_backward(&upstream, &add_batch_axis(image)?)?;
        Ok(batch.reshape(image.shape())?)
    }
}

/// `[...]` to `[1, ...]`, detached from any caller graph.
pub(crate) fn add_batch_axis(t: &Tensor) -> Result<Tensor, ModelError> {
    let mut shape = vec![1];
    shape.extend(t.shape());
    Ok(t.detach().reshape(shape)?)
}
