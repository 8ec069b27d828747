use std::fmt::Debug;
use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::buffer::Buffer;
use crate::error::AdvrsError;
use crate::tensor::Tensor;
use crate::types::DType;

/// Internal storage and metadata for a Tensor.
///
/// Holds the typed buffer, the shape and the autograd bookkeeping.
/// Data is always contiguous in row-major order.
/// It is wrapped in `Arc<RwLock<TensorData>>` by the `Tensor` struct.
#[derive(Debug)]
pub struct TensorData {
    /// The underlying typed buffer.
    pub(crate) buffer: Buffer,
    /// The shape (dimensions) of the tensor.
    pub(crate) shape: Vec<usize>,
    /// Flag indicating if operations involving this tensor are tracked.
    pub(crate) requires_grad: bool,
    /// Gradient accumulated by `Tensor::backward`. Only leaves receive one.
    pub(crate) grad: Option<Tensor>,
    /// The operation that produced this tensor. Leaves have `None`.
    pub(crate) grad_fn: Option<Arc<dyn BackwardOp>>,
}

impl TensorData {
    /// Wraps a buffer after checking that its length matches `shape`.
    ///
    /// # Errors
    /// Returns `AdvrsError::TensorCreationError` if the buffer length does not match
    /// the number of elements described by `shape`.
    pub fn from_buffer(buffer: Buffer, shape: Vec<usize>) -> Result<Self, AdvrsError> {
        let numel: usize = shape.iter().product();
        let data_len = buffer.len();
        if data_len != numel {
            return Err(AdvrsError::TensorCreationError { data_len, shape });
        }
        Ok(TensorData {
            buffer,
            shape,
            requires_grad: false,
            grad: None,
            grad_fn: None,
        })
    }

    /// Creates a new `TensorData` holding f32 values.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, AdvrsError> {
        Self::from_buffer(Buffer::F32(Arc::new(data_vec)), shape)
    }

    /// Creates a new `TensorData` holding f64 values.
    pub fn new_f64(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self, AdvrsError> {
        Self::from_buffer(Buffer::F64(Arc::new(data_vec)), shape)
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn dtype(&self) -> DType {
        self.buffer.dtype()
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}
