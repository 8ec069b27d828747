use std::sync::Arc;

use crate::autograd::BackwardOp;
use crate::error::AdvrsError;
use crate::ops::activation::log_softmax::log_softmax_rows;
use crate::ops::activation::softmax::softmax_rows;
use crate::ops::linalg::matrix_dims;
use crate::ops::traits::Numeric;
use crate::tensor::Tensor;
use crate::types::DType;

fn cross_entropy_kernel<T: Numeric>(logits: &[T], labels: &[usize], classes: usize) -> Vec<T> {
    let log_probs = log_softmax_rows(logits, classes);
    labels
        .iter()
        .enumerate()
        .map(|(n, &label)| -log_probs[n * classes + label])
        .collect()
}

/// `g[n] * (softmax(row n) - onehot(label n))`.
fn cross_entropy_backward_kernel<T: Numeric>(
    logits: &[T],
    labels: &[usize],
    classes: usize,
    g: &[T],
) -> Vec<T> {
    let mut out = softmax_rows(logits, classes);
    for (n, &label) in labels.iter().enumerate() {
        out[n * classes + label] -= T::one();
        for value in &mut out[n * classes..(n + 1) * classes] {
            *value *= g[n];
        }
    }
    out
}

#[derive(Debug)]
struct SparseCrossEntropyBackward {
    logits: Tensor,
    labels: Vec<usize>,
    classes: usize,
}

impl BackwardOp for SparseCrossEntropyBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let buffer = self.logits.buffer();
        let g_buffer = grad_output.buffer().cast(buffer.dtype());
        let shape = self.logits.shape();
        let grad = match buffer.dtype() {
            DType::F32 => Tensor::from_numeric(
                cross_entropy_backward_kernel(
                    f32::slice(&buffer)?,
                    &self.labels,
                    self.classes,
                    f32::slice(&g_buffer)?,
                ),
                shape,
            )?,
            DType::F64 => Tensor::from_numeric(
                cross_entropy_backward_kernel(
                    f64::slice(&buffer)?,
                    &self.labels,
                    self.classes,
                    f64::slice(&g_buffer)?,
                ),
                shape,
            )?,
        };
        Ok(vec![grad])
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.logits.clone()]
    }
}

/// Per-example cross-entropy of `logits` `[N, C]` against integer `labels`, returning `[N]`.
///
/// `loss[n] = logsumexp(logits[n]) - logits[n, labels[n]]`, computed through a stable
/// log-softmax.
///
/// # Errors
/// * `RankMismatch` if `logits` is not a matrix.
/// * `ShapeMismatch` if `labels.len() != N`.
/// * `IndexOutOfBounds` if a label is `>= C`.
pub fn sparse_cross_entropy_op(logits: &Tensor, labels: &[usize]) -> Result<Tensor, AdvrsError> {
    let (batch, classes) = matrix_dims(logits, "sparse_cross_entropy_op")?;
    if classes == 0 {
        return Err(AdvrsError::ShapeMismatch {
            expected: vec![batch, 1],
            actual: vec![batch, 0],
            operation: "sparse_cross_entropy_op".to_string(),
        });
    }
    if labels.len() != batch {
        return Err(AdvrsError::ShapeMismatch {
            expected: vec![batch],
            actual: vec![labels.len()],
            operation: "sparse_cross_entropy_op".to_string(),
        });
    }
    if let Some(&label) = labels.iter().find(|&&l| l >= classes) {
        return Err(AdvrsError::IndexOutOfBounds {
            index: label,
            bound: classes,
            operation: "sparse_cross_entropy_op".to_string(),
        });
    }
    let buffer = logits.buffer();
    let output = match buffer.dtype() {
        DType::F32 => Tensor::from_numeric(
            cross_entropy_kernel(f32::slice(&buffer)?, labels, classes),
            vec![batch],
        )?,
        DType::F64 => Tensor::from_numeric(
            cross_entropy_kernel(f64::slice(&buffer)?, labels, classes),
            vec![batch],
        )?,
    };
    crate::ops::attach_grad_fn(&output, logits.requires_grad(), || {
        Arc::new(SparseCrossEntropyBackward {
            logits: logits.clone(),
            labels: labels.to_vec(),
            classes,
        })
    });
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::grad_check::check_grad;
    use crate::utils::testing::create_test_tensor_f64_with_grad;
    use approx::assert_relative_eq;

    #[test]
    fn test_cross_entropy_uniform_logits() {
        let logits = Tensor::new_f64(vec![0.0; 8], vec![2, 4]).unwrap();
        let loss = sparse_cross_entropy_op(&logits, &[0, 3]).unwrap();
        assert_eq!(loss.shape(), vec![2]);
        for value in loss.get_f64_data().unwrap() {
            assert_relative_eq!(value, 4.0f64.ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cross_entropy_validates_labels() {
        let logits = Tensor::new(vec![0.0; 6], vec![2, 3]).unwrap();
        assert!(matches!(
            sparse_cross_entropy_op(&logits, &[0]),
            Err(AdvrsError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            sparse_cross_entropy_op(&logits, &[0, 3]),
            Err(AdvrsError::IndexOutOfBounds { index: 3, bound: 3, .. })
        ));
        let flat = Tensor::new(vec![0.0; 3], vec![3]).unwrap();
        assert!(matches!(
            sparse_cross_entropy_op(&flat, &[0]),
            Err(AdvrsError::RankMismatch { .. })
        ));
    }

    #[test]
    fn test_cross_entropy_backward() {
        let logits =
            create_test_tensor_f64_with_grad(vec![0.3, -1.2, 2.0, 0.0, 0.5, 0.5], vec![2, 3]);
        let output_grad = Tensor::new_f64(vec![1.0, -0.5], vec![2]).unwrap();
        check_grad(
            |xs: &[Tensor]| sparse_cross_entropy_op(&xs[0], &[2, 1]),
            &[logits],
            &output_grad,
            1e-6,
            1e-6,
        )
        .unwrap();
    }
}
