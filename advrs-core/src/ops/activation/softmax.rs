use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::traits::Numeric;
use crate::tensor::Tensor;
use crate::types::DType;

/// Number of elements along the last axis, checking the tensor has one.
pub(crate) fn last_axis_len(a: &Tensor, operation: &str) -> Result<usize, AdvrsError> {
    let shape = a.shape();
    match shape.last() {
        Some(&cols) if cols > 0 => Ok(cols),
        Some(_) => Err(AdvrsError::ShapeMismatch {
            expected: vec![1],
            actual: shape,
            operation: operation.to_string(),
        }),
        None => Err(AdvrsError::RankMismatch {
            expected: 1,
            actual: 0,
            operation: operation.to_string(),
        }),
    }
}

/// Row-wise softmax over contiguous rows of length `cols`, shifted by the row maximum.
pub(crate) fn softmax_rows<T: Numeric>(data: &[T], cols: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(data.len());
    for row in data.chunks(cols) {
        let max = row.iter().fold(T::neg_infinity(), |m, &x| m.max(x));
        let exps: Vec<T> = row.iter().map(|&x| (x - max).exp()).collect();
        let total = exps.iter().fold(T::zero(), |acc, &e| acc + e);
        out.extend(exps.into_iter().map(|e| e / total));
    }
    out
}

/// `s * (g - sum(g * s))` per row, the softmax vector-Jacobian product.
fn softmax_backward_rows<T: Numeric>(s: &[T], g: &[T], cols: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(s.len());
    for (s_row, g_row) in s.chunks(cols).zip(g.chunks(cols)) {
        let dot = s_row.iter().zip(g_row).fold(T::zero(), |acc, (&si, &gi)| acc + si * gi);
        out.extend(s_row.iter().zip(g_row).map(|(&si, &gi)| si * (gi - dot)));
    }
    out
}

#[derive(Debug)]
struct SoftmaxBackward {
    a: Tensor,
    cols: usize,
}

impl BackwardOp for SoftmaxBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let a_buffer = self.a.buffer();
        let dtype = a_buffer.dtype();
        let g_buffer = grad_output.buffer().cast(dtype);
        let shape = self.a.shape();
        match dtype {
            DType::F32 => {
                let s = softmax_rows(f32::slice(&a_buffer)?, self.cols);
                let g = f32::slice(&g_buffer)?;
                Tensor::from_numeric(softmax_backward_rows(&s, g, self.cols), shape)
            }
            DType::F64 => {
                let s = softmax_rows(f64::slice(&a_buffer)?, self.cols);
                let g = f64::slice(&g_buffer)?;
                Tensor::from_numeric(softmax_backward_rows(&s, g, self.cols), shape)
            }
        }
        .map(|g| vec![g])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Softmax along the last axis.
///
/// # Errors
/// `RankMismatch` for rank-0 input, `ShapeMismatch` if the last axis is empty.
pub fn softmax_op(a: &Tensor) -> Result<Tensor, AdvrsError> {
    let cols = last_axis_len(a, "softmax_op")?;
    let buffer = a.buffer();
    let output = match buffer.dtype() {
        DType::F32 => Tensor::from_numeric(softmax_rows(f32::slice(&buffer)?, cols), a.shape())?,
        DType::F64 => Tensor::from_numeric(softmax_rows(f64::slice(&buffer)?, cols), a.shape())?,
    };
    crate::ops::attach_grad_fn(&output, a.requires_grad(), || {
        Arc::new(SoftmaxBackward { a: a.clone(), cols })
    });
    Ok(output)
}
