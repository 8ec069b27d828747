use num_traits::{Float, NumAssignOps};
use std::fmt::Debug;
use std::sync::Arc;

use crate::buffer::Buffer;
use crate::error::AdvrsError;
use crate::types::DType;

/// Floating-point element types the CPU kernels are generic over (`f32`, `f64`).
pub trait Numeric: Float + NumAssignOps + Debug + Send + Sync + 'static {
    /// The `DType` tag matching `Self`.
    const DTYPE: DType;

    /// Borrows the buffer's elements, failing if the buffer holds another type.
    fn slice(buffer: &Buffer) -> Result<&[Self], AdvrsError>;

    /// Wraps owned elements in a buffer.
    fn into_buffer(data: Vec<Self>) -> Buffer;

    /// Converts an `f64` constant into `Self`.
    fn from_f64(value: f64) -> Self;
}

impl Numeric for f32 {
    const DTYPE: DType = DType::F32;

    fn slice(buffer: &Buffer) -> Result<&[Self], AdvrsError> {
        Ok(buffer.try_get_cpu_f32()?.as_slice())
    }

    fn into_buffer(data: Vec<Self>) -> Buffer {
        Buffer::F32(Arc::new(data))
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Numeric for f64 {
    const DTYPE: DType = DType::F64;

    fn slice(buffer: &Buffer) -> Result<&[Self], AdvrsError> {
        Ok(buffer.try_get_cpu_f64()?.as_slice())
    }

    fn into_buffer(data: Vec<Self>) -> Buffer {
        Buffer::F64(Arc::new(data))
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}
