use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::linalg::matrix_dims;
use crate::ops::traits::Numeric;
use crate::tensor::Tensor;
use crate::types::DType;

pub(crate) fn transpose_kernel<T: Numeric>(data: &[T], rows: usize, cols: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(data.len());
    for j in 0..cols {
        for i in 0..rows {
            out.push(data[i * cols + j]);
        }
    }
    out
}

#[derive(Debug)]
struct TransposeBackward {
    a: Tensor,
}

impl BackwardOp for TransposeBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        Ok(vec![transpose_op(&grad_output.detach())?])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Swaps the two axes of a matrix. The result is a new contiguous tensor.
pub fn transpose_op(a: &Tensor) -> Result<Tensor, AdvrsError> {
    let (rows, cols) = matrix_dims(a, "transpose_op")?;
    let buffer = a.buffer();
    let output = match buffer.dtype() {
        DType::F32 => Tensor::from_numeric(
            transpose_kernel(f32::slice(&buffer)?, rows, cols),
            vec![cols, rows],
        )?,
        DType::F64 => Tensor::from_numeric(
            transpose_kernel(f64::slice(&buffer)?, rows, cols),
            vec![cols, rows],
        )?,
    };
    crate::ops::attach_grad_fn(&output, a.requires_grad(), || {
        Arc::new(TransposeBackward { a: a.clone() })
    });
    Ok(output)
}
