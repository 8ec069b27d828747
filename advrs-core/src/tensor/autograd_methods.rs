use std::sync::Arc;

use log::warn;

use crate::autograd::graph::propagate;
use crate::autograd::{resolve_seed, BackwardOp};
use crate::error::AdvrsError;
use crate::ops::arithmetic::add_op;
use crate::tensor::Tensor;

impl Tensor {
    /// Checks if this tensor requires gradient computation.
    pub fn requires_grad(&self) -> bool {
        self.read_data().requires_grad
    }

    /// Sets the `requires_grad` flag for this tensor.
    pub fn set_requires_grad(&self, requires_grad: bool) -> Result<(), AdvrsError> {
        let mut guard = self.write_data();
        if requires_grad && guard.grad_fn.is_some() {
            warn!("requires_grad set on a non-leaf tensor; its gradient will not accumulate");
        }
        guard.requires_grad = requires_grad;
        Ok(())
    }

    /// Returns a clone of the gradient tensor, if it exists.
    pub fn grad(&self) -> Option<Tensor> {
        self.read_data().grad.clone()
    }

    /// Returns the backward operation node (`grad_fn`), if any.
    pub fn grad_fn(&self) -> Option<Arc<dyn BackwardOp>> {
        self.read_data().grad_fn.clone()
    }

    /// Clears the gradient tensor associated with this tensor.
    pub fn clear_grad(&self) {
        self.write_data().grad = None;
    }

    /// Accumulates `grad_to_add` into the tensor's `grad` field.
    pub fn acc_grad(&self, grad_to_add: Tensor) -> Result<(), AdvrsError> {
        let mut guard = self.write_data();
        if grad_to_add.shape() != guard.shape {
            return Err(AdvrsError::GradientAccumulationShapeMismatch {
                expected: guard.shape.clone(),
                actual: grad_to_add.shape(),
            });
        }
        let summed = match guard.grad.take() {
            Some(existing) => add_op(&existing, &grad_to_add)?,
            None => grad_to_add,
        };
        guard.grad = Some(summed);
        Ok(())
    }

    /// Performs the backward pass starting from this tensor.
    ///
    /// Gradients are accumulated into the `grad` field of every leaf that requires them.
    ///
    /// # Arguments
    /// * `gradient`: dL/dself. If `None`, the tensor must hold exactly one element and the
    ///   seed is one.
    ///
    /// # Errors
    /// * `BackwardNonScalar` when `gradient` is `None` on a multi-element tensor.
    /// * `ShapeMismatch` when `gradient` does not have this tensor's shape.
    /// * Any error raised by an operation's backward pass.
    pub fn backward(&self, gradient: Option<Tensor>) -> Result<(), AdvrsError> {
        let seed = resolve_seed(self, gradient.as_ref())?;
        if !self.requires_grad() {
            return Ok(());
        }
        let map = propagate(self, seed)?;
        for node in &map.order {
            let is_leaf = node.grad_fn().is_none();
            if is_leaf {
                if let Some(g) = map.grads.get(&node.node_id()) {
                    node.acc_grad(g.clone())?;
                }
            }
        }
        Ok(())
    }
}
