use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::activation::softmax::{last_axis_len, softmax_rows};
use crate::ops::traits::Numeric;
use crate::tensor::Tensor;
use crate::types::DType;

/// Row-wise `x - max - ln(sum(exp(x - max)))`.
pub(crate) fn log_softmax_rows<T: Numeric>(data: &[T], cols: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(data.len());
    for row in data.chunks(cols) {
        let max = row.iter().fold(T::neg_infinity(), |m, &x| m.max(x));
        let total = row.iter().fold(T::zero(), |acc, &x| acc + (x - max).exp());
        let log_total = total.ln();
        out.extend(row.iter().map(|&x| x - max - log_total));
    }
    out
}

/// `g - softmax(a) * sum(g)` per row.
fn log_softmax_backward_rows<T: Numeric>(a: &[T], g: &[T], cols: usize) -> Vec<T> {
    let s = softmax_rows(a, cols);
    let mut out = Vec::with_capacity(a.len());
    for (s_row, g_row) in s.chunks(cols).zip(g.chunks(cols)) {
        let g_sum = g_row.iter().fold(T::zero(), |acc, &x| acc + x);
        out.extend(s_row.iter().zip(g_row).map(|(&si, &gi)| gi - si * g_sum));
    }
    out
}

#[derive(Debug)]
struct LogSoftmaxBackward {
    a: Tensor,
    cols: usize,
}

impl BackwardOp for LogSoftmaxBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let a_buffer = self.a.buffer();
        let g_buffer = grad_output.buffer().cast(a_buffer.dtype());
        let shape = self.a.shape();
        let grad = match a_buffer.dtype() {
            DType::F32 => Tensor::from_numeric(
                log_softmax_backward_rows(
                    f32::slice(&a_buffer)?,
                    f32::slice(&g_buffer)?,
                    self.cols,
                ),
                shape,
            )?,
            DType::F64 => Tensor::from_numeric(
                log_softmax_backward_rows(
                    f64::slice(&a_buffer)?,
                    f64::slice(&g_buffer)?,
                    self.cols,
                ),
                shape,
            )?,
        };
        Ok(vec![grad])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Log-softmax along the last axis, computed with the max-shift for stability.
pub fn log_softmax_op(a: &Tensor) -> Result<Tensor, AdvrsError> {
    let cols = last_axis_len(a, "log_softmax_op")?;
    let buffer = a.buffer();
    let output = match buffer.dtype() {
        DType::F32 => {
            Tensor::from_numeric(log_softmax_rows(f32::slice(&buffer)?, cols), a.shape())?
        }
        DType::F64 => {
            Tensor::from_numeric(log_softmax_rows(f64::slice(&buffer)?, cols), a.shape())?
        }
    };
    crate::ops::attach_grad_fn(&output, a.requires_grad(), || {
        Arc::new(LogSoftmaxBackward { a: a.clone(), cols })
    });
    Ok(output)
}
