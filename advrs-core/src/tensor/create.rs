use rand::Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};

use crate::buffer::Buffer;
use crate::error::AdvrsError;
use crate::tensor::Tensor;
use crate::tensor_data::TensorData;
use crate::types::DType;
use std::sync::Arc;

fn filled(dtype: DType, numel: usize, values: impl Iterator<Item = f64>) -> Buffer {
    match dtype {
        DType::F32 => Buffer::F32(Arc::new(values.take(numel).map(|v| v as f32).collect())),
        DType::F64 => Buffer::F64(Arc::new(values.take(numel).collect())),
    }
}

/// Creates a tensor of `dtype` with every element set to `value`.
pub fn full(shape: &[usize], value: f64, dtype: DType) -> Result<Tensor, AdvrsError> {
    let numel = shape.iter().product();
    let buffer = filled(dtype, numel, std::iter::repeat(value));
    Tensor::from_buffer(buffer, shape.to_vec())
}

/// Creates a new tensor filled with zeros with the specified shape.
pub fn zeros(shape: &[usize], dtype: DType) -> Result<Tensor, AdvrsError> {
    full(shape, 0.0, dtype)
}

/// Creates a new tensor filled with ones with the specified shape.
pub fn ones(shape: &[usize], dtype: DType) -> Result<Tensor, AdvrsError> {
    full(shape, 1.0, dtype)
}

/// Creates a zero tensor with the same shape and dtype as `tensor`.
pub fn zeros_like(tensor: &Tensor) -> Result<Tensor, AdvrsError> {
    zeros(&tensor.shape(), tensor.dtype())
}

/// Creates a tensor of ones with the same shape and dtype as `tensor`.
pub fn ones_like(tensor: &Tensor) -> Result<Tensor, AdvrsError> {
    ones(&tensor.shape(), tensor.dtype())
}

fn rank0(buffer: Buffer) -> Tensor {
    Tensor::from_tensor_data(TensorData {
        buffer,
        shape: vec![],
        requires_grad: false,
        grad: None,
        grad_fn: None,
    })
}

/// Creates a rank-0 F32 tensor.
pub fn scalar(value: f32) -> Tensor {
    rank0(Buffer::F32(Arc::new(vec![value])))
}

/// Creates a rank-0 F64 tensor.
pub fn scalar_f64(value: f64) -> Tensor {
    rank0(Buffer::F64(Arc::new(vec![value])))
}

/// Samples every element from the standard normal distribution.
pub fn randn<R: Rng + ?Sized>(
    shape: &[usize],
    dtype: DType,
    rng: &mut R,
) -> Result<Tensor, AdvrsError> {
    let numel: usize = shape.iter().product();
    let values: Vec<f64> = (0..numel).map(|_| StandardNormal.sample(rng)).collect();
    let buffer = filled(dtype, numel, values.into_iter());
    Tensor::from_buffer(buffer, shape.to_vec())
}

/// Samples every element uniformly from `[low, high)`.
pub fn rand_uniform<R: Rng + ?Sized>(
    shape: &[usize],
    low: f64,
    high: f64,
    dtype: DType,
    rng: &mut R,
) -> Result<Tensor, AdvrsError> {
    if !(low < high) {
        return Err(AdvrsError::UnsupportedOperation(format!(
            "rand_uniform requires low < high, got [{}, {})",
            low, high
        )));
    }
    let numel: usize = shape.iter().product();
    let dist = Uniform::new(low, high);
    let values: Vec<f64> = (0..numel).map(|_| dist.sample(rng)).collect();
    let buffer = filled(dtype, numel, values.into_iter());
    Tensor::from_buffer(buffer, shape.to_vec())
}
