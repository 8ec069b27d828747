use std::fmt;
use std::sync::Arc;

use crate::tensor::Tensor;

impl Clone for Tensor {
    /// Clones the handle, not the data: both point to the same graph node.
    fn clone(&self) -> Self {
        Tensor {
            data: Arc::clone(&self.data),
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.read_data();
        let values = guard.buffer.to_f64_vec();
        let preview: Vec<f64> = values.iter().take(8).copied().collect();
        f.debug_struct("Tensor")
            .field("dtype", &guard.dtype())
            .field("shape", &guard.shape)
            .field("requires_grad", &guard.requires_grad)
            .field("has_grad_fn", &guard.grad_fn.is_some())
            .field("data", &preview)
            .finish()
    }
}

/// Value equality: same dtype, same shape and identical elements.
impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.data, &other.data) {
            return true;
        }
        let a = self.read_data();
        let b = other.read_data();
        a.shape == b.shape && a.buffer.values_eq(&b.buffer)
    }
}
