use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::buffer::Buffer;
use crate::error::AdvrsError;
use crate::tensor::Tensor;

fn rows(buffer: &Buffer, start: usize, len: usize) -> Buffer {
    match buffer {
        Buffer::F32(data) => Buffer::F32(Arc::new(data[start..start + len].to_vec())),
        Buffer::F64(data) => Buffer::F64(Arc::new(data[start..start + len].to_vec())),
    }
}

/// Zeros of `numel` elements with `block` written at `start`.
fn scatter(block: &Buffer, numel: usize, start: usize) -> Buffer {
    match block {
        Buffer::F32(data) => {
            let mut out = vec![0.0f32; numel];
            out[start..start + data.len()].copy_from_slice(data);
            Buffer::F32(Arc::new(out))
        }
        Buffer::F64(data) => {
            let mut out = vec![0.0f64; numel];
            out[start..start + data.len()].copy_from_slice(data);
            Buffer::F64(Arc::new(out))
        }
    }
}

#[derive(Debug)]
struct SelectBackward {
    a: Tensor,
    input_shape: Vec<usize>,
    index: usize,
}

impl BackwardOp for SelectBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let row_len = grad_output.numel();
        let numel: usize = self.input_shape.iter().product();
        let buffer = scatter(&grad_output.buffer(), numel, self.index * row_len);
        Ok(vec![Tensor::from_buffer(buffer, self.input_shape.clone())?])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Selects entry `index` along axis 0, dropping that axis.
///
/// # Errors
/// `RankMismatch` for rank-0 input, `IndexOutOfBounds` if `index >= shape[0]`.
pub fn select_op(a: &Tensor, index: usize) -> Result<Tensor, AdvrsError> {
    let input_shape = a.shape();
    let first = match input_shape.first() {
        Some(&d) => d,
        None => {
            return Err(AdvrsError::RankMismatch {
                expected: 1,
                actual: 0,
                operation: "select_op".to_string(),
            })
        }
    };
    if index >= first {
        return Err(AdvrsError::IndexOutOfBounds {
            index,
            bound: first,
            operation: "select_op".to_string(),
        });
    }
    let out_shape = input_shape[1..].to_vec();
    let row_len: usize = out_shape.iter().product();
    let output = Tensor::from_buffer(rows(&a.buffer(), index * row_len, row_len), out_shape)?;
    crate::ops::attach_grad_fn(&output, a.requires_grad(), || {
        Arc::new(SelectBackward {
            a: a.clone(),
            input_shape,
            index,
        })
    });
    Ok(output)
}
