use std::sync::{Arc, RwLock};

use crate::autograd::graph::NodeId;
use crate::buffer::Buffer;
use crate::error::AdvrsError;
use crate::ops::traits::Numeric;
use crate::tensor_data::TensorData;
use crate::types::DType;

mod autograd_methods;
pub mod create;
mod traits;
pub mod utils;

pub use create::{full, ones, ones_like, rand_uniform, randn, scalar, scalar_f64, zeros, zeros_like};

/// Represents a multi-dimensional array (tensor).
///
/// `Tensor` uses `Arc<RwLock<TensorData>>` internally so clones are cheap handles
/// to the same node, and autograd metadata can be updated through a shared reference.
pub struct Tensor {
    pub(crate) data: Arc<RwLock<TensorData>>,
}

impl Tensor {
    /// Creates a new f32 Tensor with the given data and shape.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, AdvrsError> {
        Ok(Self::from_tensor_data(TensorData::new(data_vec, shape)?))
    }

    /// Creates a new f64 Tensor with the given data and shape.
    pub fn new_f64(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self, AdvrsError> {
        Ok(Self::from_tensor_data(TensorData::new_f64(data_vec, shape)?))
    }

    /// Creates a tensor from a vector of any supported element type.
    pub fn from_numeric<T: Numeric>(
        data_vec: Vec<T>,
        shape: Vec<usize>,
    ) -> Result<Self, AdvrsError> {
        Self::from_buffer(T::into_buffer(data_vec), shape)
    }

    pub(crate) fn from_buffer(buffer: Buffer, shape: Vec<usize>) -> Result<Self, AdvrsError> {
        Ok(Self::from_tensor_data(TensorData::from_buffer(buffer, shape)?))
    }

    fn from_tensor_data(tensor_data: TensorData) -> Self {
        Tensor {
            data: Arc::new(RwLock::new(tensor_data)),
        }
    }

    /// Creates a new CPU F32 Tensor from a Vec<f32> and shape.
    pub fn from_vec_f32(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, AdvrsError> {
        Self::new(data_vec, shape)
    }

    /// Creates a new CPU F64 Tensor from a Vec<f64> and shape.
    pub fn from_vec_f64(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self, AdvrsError> {
        Self::new_f64(data_vec, shape)
    }

    /// Acquires a read lock on the tensor's data.
    ///
    /// Panics if the RwLock is poisoned.
    pub fn read_data(&self) -> std::sync::RwLockReadGuard<'_, TensorData> {
        self.data.read().expect("RwLock poisoned")
    }

    /// Acquires a write lock on the tensor's data.
    ///
    /// Panics if the RwLock is poisoned.
    pub fn write_data(&self) -> std::sync::RwLockWriteGuard<'_, TensorData> {
        self.data.write().expect("RwLock poisoned")
    }

    /// Returns the data type (`DType`) of the tensor elements.
    pub fn dtype(&self) -> DType {
        self.read_data().dtype()
    }

    /// Returns a clone of the tensor's shape.
    pub fn shape(&self) -> Vec<usize> {
        self.read_data().shape.clone()
    }

    pub fn rank(&self) -> usize {
        self.read_data().shape.len()
    }

    /// Returns the number of elements in the tensor.
    pub fn numel(&self) -> usize {
        self.read_data().numel()
    }

    /// Returns a handle to the typed buffer. The element data itself is shared, not copied.
    pub fn buffer(&self) -> Buffer {
        self.read_data().buffer.clone()
    }

    /// Returns the data as a `Vec<f32>`, failing if the tensor is not F32.
    pub fn get_f32_data(&self) -> Result<Vec<f32>, AdvrsError> {
        let guard = self.read_data();
        let buffer_arc = guard.buffer().try_get_cpu_f32()?;
        Ok(buffer_arc.as_ref().clone())
    }

    /// Returns the data as a `Vec<f64>`, failing if the tensor is not F64.
    pub fn get_f64_data(&self) -> Result<Vec<f64>, AdvrsError> {
        let guard = self.read_data();
        let buffer_arc = guard.buffer().try_get_cpu_f64()?;
        Ok(buffer_arc.as_ref().clone())
    }

    /// Returns the data widened to f64 regardless of the tensor's dtype.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.read_data().buffer.to_f64_vec()
    }

    /// Returns the value of a single-element tensor as f64.
    pub fn item(&self) -> Result<f64, AdvrsError> {
        let guard = self.read_data();
        if guard.numel() != 1 {
            return Err(AdvrsError::ShapeMismatch {
                expected: vec![],
                actual: guard.shape.clone(),
                operation: "item".to_string(),
            });
        }
        Ok(guard.buffer.to_f64_vec()[0])
    }

    /// Returns a new tensor holding the same values converted to `dtype`.
    ///
    /// The result is detached from the graph. A same-dtype conversion shares the buffer.
    pub fn to_dtype(&self, dtype: DType) -> Result<Tensor, AdvrsError> {
        let guard = self.read_data();
        Tensor::from_buffer(guard.buffer.cast(dtype), guard.shape.clone())
    }

    /// Returns a new leaf tensor sharing this tensor's data, cut off from the graph.
    pub fn detach(&self) -> Tensor {
        let guard = self.read_data();
        Tensor::from_tensor_data(TensorData {
            buffer: guard.buffer.clone(),
            shape: guard.shape.clone(),
            requires_grad: false,
            grad: None,
            grad_fn: None,
        })
    }

    /// Identifier of the graph node this handle points to.
    pub fn node_id(&self) -> NodeId {
        Arc::as_ptr(&self.data)
    }

    /// Differentiable reshape, see [`crate::ops::view::reshape_op`].
    pub fn reshape(&self, new_shape: Vec<usize>) -> Result<Tensor, AdvrsError> {
        crate::ops::view::reshape_op(self, new_shape)
    }
}
