pub mod backward_op;
pub mod grad_check;
pub mod graph;

pub use backward_op::BackwardOp;

use crate::error::AdvrsError;
use crate::tensor::{ones, zeros_like, Tensor};

/// Checks an explicit seed against `output`, or builds the implicit one for single-element outputs.
pub(crate) fn resolve_seed(output: &Tensor, seed: Option<&Tensor>) -> Result<Tensor, AdvrsError> {
    match seed {
        Some(g) => {
            if g.shape() != output.shape() {
                return Err(AdvrsError::ShapeMismatch {
                    expected: output.shape(),
                    actual: g.shape(),
                    operation: "backward seed".to_string(),
                });
            }
            Ok(g.detach())
        }
        None => {
            if output.numel() != 1 {
                return Err(AdvrsError::BackwardNonScalar);
            }
            ones(&output.shape(), output.dtype())
        }
    }
}

/// Computes the gradients of `output` with respect to `inputs` without touching their
/// `grad` fields.
///
/// `seed` is dL/dOutput; `None` is only allowed for single-element outputs. With a seed
/// `v` this is the vector-Jacobian product `v^T J`. Inputs the output does not depend on
/// receive zeros. Every returned gradient has its input's shape and dtype.
pub fn grad(
    output: &Tensor,
    seed: Option<&Tensor>,
    inputs: &[Tensor],
) -> Result<Vec<Tensor>, AdvrsError> {
    let seed = resolve_seed(output, seed)?;
    if !output.requires_grad() {
        return inputs.iter().map(zeros_like).collect();
    }
    let map = graph::propagate(output, seed)?;
    inputs
        .iter()
        .map(|input| match map.grads.get(&input.node_id()) {
            Some(g) => Ok(g.clone()),
            None => zeros_like(input),
        })
        .collect()
}
