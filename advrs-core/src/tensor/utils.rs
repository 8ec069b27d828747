use crate::error::AdvrsError;
use crate::ops::traits::Numeric;
use crate::tensor::Tensor;
use crate::types::DType;

/// Calculates contiguous (row-major) strides for a given shape.
pub fn calculate_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut current_stride = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = current_stride;
        current_stride *= shape[i];
    }
    strides
}

/// Computes the shape two operands broadcast to, numpy style.
pub fn broadcast_shapes(shape1: &[usize], shape2: &[usize]) -> Result<Vec<usize>, AdvrsError> {
    let rank = shape1.len().max(shape2.len());
    let mut result = vec![0; rank];
    for i in 0..rank {
        let d1 = if i < rank - shape1.len() { 1 } else { shape1[i - (rank - shape1.len())] };
        let d2 = if i < rank - shape2.len() { 1 } else { shape2[i - (rank - shape2.len())] };
        result[i] = if d1 == d2 {
            d1
        } else if d1 == 1 {
            d2
        } else if d2 == 1 {
            d1
        } else {
            return Err(AdvrsError::BroadcastError {
                shape1: shape1.to_vec(),
                shape2: shape2.to_vec(),
            });
        };
    }
    Ok(result)
}

/// Converts a linear index into coordinates for a contiguous tensor of `shape`.
pub fn index_to_coord(index: usize, shape: &[usize]) -> Vec<usize> {
    let mut coords = vec![0; shape.len()];
    let mut remainder = index;
    for i in (0..shape.len()).rev() {
        if shape[i] > 0 {
            coords[i] = remainder % shape[i];
            remainder /= shape[i];
        }
    }
    coords
}

/// Strides for reading a tensor of `shape` as if it had `target_shape`.
///
/// Broadcast dimensions (missing or of size 1) get stride 0.
pub fn broadcast_strides(shape: &[usize], target_shape: &[usize]) -> Vec<usize> {
    let own = calculate_strides(shape);
    let offset = target_shape.len() - shape.len();
    (0..target_shape.len())
        .map(|i| {
            if i < offset || shape[i - offset] == 1 {
                0
            } else {
                own[i - offset]
            }
        })
        .collect()
}

fn reduce_kernel<T: Numeric>(grad: &[T], grad_shape: &[usize], target_shape: &[usize]) -> Vec<T> {
    let numel: usize = target_shape.iter().product();
    let mut out = vec![T::zero(); numel];
    let strides = broadcast_strides(target_shape, grad_shape);
    for (i, &g) in grad.iter().enumerate() {
        let coords = index_to_coord(i, grad_shape);
        let offset: usize = coords.iter().zip(strides.iter()).map(|(c, s)| c * s).sum();
        out[offset] += g;
    }
    out
}

impl Tensor {
    /// Sums a broadcast gradient back down to `target_shape`.
    ///
    /// The result is detached. `target_shape` must broadcast to the tensor's shape.
    pub fn reduce_to_shape(&self, target_shape: &[usize]) -> Result<Tensor, AdvrsError> {
        let shape = self.shape();
        if shape == target_shape {
            return Ok(self.detach());
        }
        if target_shape.len() > shape.len() || broadcast_shapes(target_shape, &shape)? != shape {
            return Err(AdvrsError::ShapeMismatch {
                expected: target_shape.to_vec(),
                actual: shape,
                operation: "reduce_to_shape".to_string(),
            });
        }
        let buffer = self.buffer();
        match buffer.dtype() {
            DType::F32 => Tensor::from_numeric(
                reduce_kernel(f32::slice(&buffer)?, &shape, target_shape),
                target_shape.to_vec(),
            ),
            DType::F64 => Tensor::from_numeric(
                reduce_kernel(f64::slice(&buffer)?, &shape, target_shape),
                target_shape.to_vec(),
            ),
        }
    }
}
