pub mod matmul;
pub mod transpose;

pub use matmul::matmul_op;
pub use transpose::transpose_op;

use crate::error::AdvrsError;
use crate::tensor::Tensor;

/// Returns `(rows, cols)` of a rank-2 tensor.
pub(crate) fn matrix_dims(a: &Tensor, operation: &str) -> Result<(usize, usize), AdvrsError> {
    let shape = a.shape();
    if shape.len() != 2 {
        return Err(AdvrsError::RankMismatch {
            expected: 2,
            actual: shape.len(),
            operation: operation.to_string(),
        });
    }
    Ok((shape[0], shape[1]))
}
