use crate::error::AdvrsError;
use crate::tensor::Tensor;
use std::fmt::Debug;

/// Defines the interface for the backward pass of a differentiable tensor operation.
///
/// Every operation that produces a tensor from inputs requiring gradients stores an
/// implementation in the output's `grad_fn`. The backward pass walks these nodes in
/// reverse topological order and applies the chain rule through them.
///
/// The `Debug + Send + Sync` bounds let `Arc<dyn BackwardOp>` live inside the
/// `RwLock`-protected tensor data.
pub trait BackwardOp: Debug + Send + Sync {
    /// Computes the gradient of each input given the gradient of the output.
    ///
    /// # Arguments
    /// * `grad_output`: dL/dOutput, with the same shape as the operation's output.
    ///
    /// # Returns
    /// One gradient per input, in the order returned by [`BackwardOp::inputs`]. Each
    /// gradient has the shape of its input. Gradients are computed on detached data and
    /// never carry a `grad_fn` themselves.
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError>;

    /// Returns handles to the input nodes that took part in the forward operation.
    ///
    /// The order **must** match the order of gradients returned by `backward()`.
    fn inputs(&self) -> Vec<Tensor>;
}
