//! # Tensor Operations Module (`ops`)
//!
//! Operations are grouped by kind into submodules. Each one has an `xxx_op` function
//! that computes the forward result and, when any input requires gradients, attaches a
//! `Backward` struct implementing [`BackwardOp`] to the output.
//!
//! - [`arithmetic`]: broadcasting add, sub, mul, div and neg.
//! - [`math_elem`]: element-wise ln, exp and clamp.
//! - [`activation`]: relu, softmax and log_softmax.
//! - [`linalg`]: 2-D matmul and transpose.
//! - [`reduction`]: sum over all or selected axes.
//! - [`view`]: reshape and select.
//! - [`loss`]: fused sparse cross-entropy.

pub mod activation;
pub mod arithmetic;
pub mod linalg;
pub mod loss;
pub mod math_elem;
pub mod reduction;
pub mod traits;
pub mod view;

use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::tensor::utils::{broadcast_shapes, broadcast_strides, index_to_coord};
use crate::tensor::Tensor;
use crate::types::DType;
use traits::Numeric;

/// Maps every element through `op_f32`/`op_f64` without recording anything for autograd.
pub(crate) fn map_values<F32Op, F64Op>(
    a: &Tensor,
    op_f32: F32Op,
    op_f64: F64Op,
) -> Result<Tensor, AdvrsError>
where
    F32Op: Fn(f32) -> f32,
    F64Op: Fn(f64) -> f64,
{
    let guard = a.read_data();
    let shape = guard.shape.clone();
    match guard.dtype() {
        DType::F32 => {
            let data: Vec<f32> =
                guard.buffer().try_get_cpu_f32()?.iter().map(|&x| op_f32(x)).collect();
            drop(guard);
            Tensor::new(data, shape)
        }
        DType::F64 => {
            let data: Vec<f64> =
                guard.buffer().try_get_cpu_f64()?.iter().map(|&x| op_f64(x)).collect();
            drop(guard);
            Tensor::new_f64(data, shape)
        }
    }
}

/// Attaches `grad_fn` to `output` when `requires_grad` is set.
pub(crate) fn attach_grad_fn(
    output: &Tensor,
    requires_grad: bool,
    grad_fn: impl FnOnce() -> Arc<dyn BackwardOp>,
) {
    if requires_grad {
        let mut guard = output.write_data();
        guard.grad_fn = Some(grad_fn());
        guard.requires_grad = true;
    }
}

/// Applies a unary element-wise operation to a tensor.
///
/// Handles DType dispatch (F32, F64), output creation and autograd setup.
///
/// # Arguments
/// * `a`: The input tensor.
/// * `op_f32`: The operation for F32 elements.
/// * `op_f64`: The operation for F64 elements.
/// * `backward_builder`: Builds the `BackwardOp` from a handle to the input. Only called
///   when the input requires gradients.
pub(crate) fn apply_unary_op<F32Op, F64Op, B>(
    a: &Tensor,
    op_f32: F32Op,
    op_f64: F64Op,
    backward_builder: B,
) -> Result<Tensor, AdvrsError>
where
    F32Op: Fn(f32) -> f32,
    F64Op: Fn(f64) -> f64,
    B: FnOnce(Tensor) -> Arc<dyn BackwardOp>,
{
    let output = map_values(a, op_f32, op_f64)?;
    attach_grad_fn(&output, a.requires_grad(), || backward_builder(a.clone()));
    Ok(output)
}

fn broadcast_kernel<T: Numeric>(
    a: &[T],
    a_shape: &[usize],
    b: &[T],
    b_shape: &[usize],
    out_shape: &[usize],
    op: impl Fn(T, T) -> T,
) -> Vec<T> {
    let numel: usize = out_shape.iter().product();
    if a_shape == out_shape && b_shape == out_shape {
        return a.iter().zip(b.iter()).map(|(&x, &y)| op(x, y)).collect();
    }
    let a_strides = broadcast_strides(a_shape, out_shape);
    let b_strides = broadcast_strides(b_shape, out_shape);
    (0..numel)
        .map(|i| {
            let coords = index_to_coord(i, out_shape);
            let offset = |strides: &[usize]| -> usize {
                coords.iter().zip(strides).map(|(c, s)| c * s).sum()
            };
            op(a[offset(&a_strides[..])], b[offset(&b_strides[..])])
        })
        .collect()
}

/// Applies a broadcasting binary element-wise operation.
///
/// Operands of different dtypes are computed in the promoted dtype (F64 wins).
/// `backward_builder` receives handles to both inputs and is only called when at least
/// one of them requires gradients.
pub(crate) fn apply_binary_op<F32Op, F64Op, B>(
    a: &Tensor,
    b: &Tensor,
    op_f32: F32Op,
    op_f64: F64Op,
    backward_builder: B,
    op_name: &str,
) -> Result<Tensor, AdvrsError>
where
    F32Op: Fn(f32, f32) -> f32,
    F64Op: Fn(f64, f64) -> f64,
    B: FnOnce(Tensor, Tensor) -> Arc<dyn BackwardOp>,
{
    let a_shape = a.shape();
    let b_shape = b.shape();
    let out_shape = broadcast_shapes(&a_shape, &b_shape)?;
    let dtype = DType::promote(a.dtype(), b.dtype());
    let a_buffer = a.buffer().cast(dtype);
    let b_buffer = b.buffer().cast(dtype);

    let output = match dtype {
        DType::F32 => Tensor::from_numeric(
            broadcast_kernel(
                f32::slice(&a_buffer)?,
                &a_shape,
                f32::slice(&b_buffer)?,
                &b_shape,
                &out_shape,
                op_f32,
            ),
            out_shape,
        ),
        DType::F64 => Tensor::from_numeric(
            broadcast_kernel(
                f64::slice(&a_buffer)?,
                &a_shape,
                f64::slice(&b_buffer)?,
                &b_shape,
                &out_shape,
                op_f64,
            ),
            out_shape,
        ),
    }
    .map_err(|e| {
        AdvrsError::InternalError(format!("{} produced an invalid tensor: {}", op_name, e))
    })?;

    let requires_grad = a.requires_grad() || b.requires_grad();
    attach_grad_fn(&output, requires_grad, || backward_builder(a.clone(), b.clone()));
    Ok(output)
}
