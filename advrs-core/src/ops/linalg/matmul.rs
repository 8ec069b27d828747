use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::linalg::{matrix_dims, transpose_op};
use crate::ops::traits::Numeric;
use crate::tensor::Tensor;
use crate::types::DType;

fn matmul_kernel<T: Numeric>(a: &[T], b: &[T], m: usize, k: usize, n: usize) -> Vec<T> {
    let mut out = vec![T::zero(); m * n];
    for i in 0..m {
        for p in 0..k {
            let a_ip = a[i * k + p];
            for j in 0..n {
                out[i * n + j] += a_ip * b[p * n + j];
            }
        }
    }
    out
}

/// Backward pass for `C = A @ B`.
///
/// `grad_A = grad_C @ B^T`, `grad_B = A^T @ grad_C`.
#[derive(Debug)]
struct MatmulBackward {
    a: Tensor,
    b: Tensor,
}

impl BackwardOp for MatmulBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let grad = grad_output.detach();
        let grad_a = matmul_op(&grad, &transpose_op(&self.b.detach())?)?;
        let grad_b = matmul_op(&transpose_op(&self.a.detach())?, &grad)?;
        Ok(vec![grad_a, grad_b])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }
}

/// Matrix product of `a` `[m, k]` and `b` `[k, n]`.
///
/// Mixed dtypes are computed in F64.
///
/// # Errors
/// `RankMismatch` for non-matrix operands, `ShapeMismatch` when the inner dimensions differ.
pub fn matmul_op(a: &Tensor, b: &Tensor) -> Result<Tensor, AdvrsError> {
    let (m, k) = matrix_dims(a, "matmul_op")?;
    let (k2, n) = matrix_dims(b, "matmul_op")?;
    if k != k2 {
        return Err(AdvrsError::ShapeMismatch {
            expected: vec![k, n],
            actual: vec![k2, n],
            operation: "matmul_op".to_string(),
        });
    }
    let dtype = DType::promote(a.dtype(), b.dtype());
    let a_buffer = a.buffer().cast(dtype);
    let b_buffer = b.buffer().cast(dtype);
    let output = match dtype {
        DType::F32 => Tensor::from_numeric(
            matmul_kernel(f32::slice(&a_buffer)?, f32::slice(&b_buffer)?, m, k, n),
            vec![m, n],
        )?,
        DType::F64 => Tensor::from_numeric(
            matmul_kernel(f64::slice(&a_buffer)?, f64::slice(&b_buffer)?, m, k, n),
            vec![m, n],
        )?,
    };
    let requires_grad = a.requires_grad() || b.requires_grad();
    crate::ops::attach_grad_fn(&output, requires_grad, || {
        Arc::new(MatmulBackward { a: a.clone(), b: b.clone() })
    });
    Ok(output)
}

#[cfg(test)]
#[path = "matmul_test.rs"]
mod tests;
