use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::arithmetic::add_op;
use crate::ops::traits::Numeric;
use crate::tensor::utils::{broadcast_strides, index_to_coord};
use crate::tensor::{zeros, Tensor};
use crate::types::DType;

/// Sums `data` of `shape` into `keep_shape`, where reduced axes have size 1.
fn sum_kernel<T: Numeric>(data: &[T], shape: &[usize], keep_shape: &[usize]) -> Vec<T> {
    let numel: usize = keep_shape.iter().product();
    let mut out = vec![T::zero(); numel];
    let strides = broadcast_strides(keep_shape, shape);
    for (i, &x) in data.iter().enumerate() {
        let coords = index_to_coord(i, shape);
        let offset: usize = coords.iter().zip(&strides).map(|(c, s)| c * s).sum();
        out[offset] += x;
    }
    out
}

/// Backward pass for summation: the output gradient is broadcast back over the reduced axes.
#[derive(Debug)]
struct SumBackward {
    a: Tensor,
    input_shape: Vec<usize>,
    keep_shape: Vec<usize>,
}

impl BackwardOp for SumBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let grad_keep = Tensor::from_buffer(grad_output.buffer(), self.keep_shape.clone())?;
        let base = zeros(&self.input_shape, grad_keep.dtype())?;
        Ok(vec![add_op(&base, &grad_keep)?])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Sums elements over `axes` (all axes when `None`).
///
/// With `keep_dims` the reduced axes stay as size 1; otherwise they are removed, so a full
/// reduction yields a rank-0 tensor.
///
/// # Errors
/// `IndexOutOfBounds` if an axis is not smaller than the rank.
pub fn sum_op(a: &Tensor, axes: Option<&[usize]>, keep_dims: bool) -> Result<Tensor, AdvrsError> {
    let input_shape = a.shape();
    let rank = input_shape.len();
    let reduced: Vec<bool> = match axes {
        None => vec![true; rank],
        Some(list) => {
            let mut flags = vec![false; rank];
            for &axis in list {
                if axis >= rank {
                    return Err(AdvrsError::IndexOutOfBounds {
                        index: axis,
                        bound: rank,
                        operation: "sum_op".to_string(),
                    });
                }
                flags[axis] = true;
            }
            flags
        }
    };
    let keep_shape: Vec<usize> = input_shape
        .iter()
        .zip(&reduced)
        .map(|(&d, &r)| if r { 1 } else { d })
        .collect();
    let output_shape: Vec<usize> = if keep_dims {
        keep_shape.clone()
    } else {
        input_shape
            .iter()
            .zip(&reduced)
            .filter(|&(_, &r)| !r)
            .map(|(&d, _)| d)
            .collect()
    };

    let buffer = a.buffer();
    let output = match buffer.dtype() {
        DType::F32 => Tensor::from_numeric(
            sum_kernel(f32::slice(&buffer)?, &input_shape, &keep_shape),
            output_shape,
        )?,
        DType::F64 => Tensor::from_numeric(
            sum_kernel(f64::slice(&buffer)?, &input_shape, &keep_shape),
            output_shape,
        )?,
    };
    crate::ops::attach_grad_fn(&output, a.requires_grad(), || {
        Arc::new(SumBackward {
            a: a.clone(),
            input_shape,
            keep_shape,
        })
    });
    Ok(output)
}

#[cfg(test)]
#[path = "sum_test.rs"]
mod tests;
