use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::AdvrsError;
use crate::ops::arithmetic::add_op;
use crate::tensor::Tensor;
use crate::tensor_data::TensorData;

/// Stable identity of a node in the computation graph.
///
/// The address of the shared `RwLock<TensorData>`, identical for every clone of a `Tensor`.
pub type NodeId = *const RwLock<TensorData>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Sorts every node reachable from `root` that requires gradients.
///
/// Inputs come before the nodes computed from them, so iterating the result in
/// reverse visits `root` first.
///
/// # Errors
/// `AdvrsError::CycleDetected` if a node is reachable from itself.
pub fn topological_sort(root: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
    let mut marks: HashMap<NodeId, Mark> = HashMap::new();
    let mut sorted = Vec::new();
    let mut stack: Vec<(Tensor, bool)> = vec![(root.clone(), false)];

    while let Some((node, expanded)) = stack.pop() {
        let id = node.node_id();
        if expanded {
            marks.insert(id, Mark::Done);
            sorted.push(node);
            continue;
        }
        match marks.get(&id) {
            Some(Mark::Done) => continue,
            Some(Mark::InProgress) => return Err(AdvrsError::CycleDetected),
            None => {}
        }
        marks.insert(id, Mark::InProgress);
        let inputs = match node.grad_fn() {
            Some(op) => op.inputs(),
            None => Vec::new(),
        };
        stack.push((node, true));
        for input in inputs {
            if input.requires_grad() && marks.get(&input.node_id()) != Some(&Mark::Done) {
                stack.push((input, false));
            }
        }
    }
    Ok(sorted)
}

/// Gradients of `output` with respect to every node it depends on.
pub(crate) struct GradientMap {
    pub(crate) order: Vec<Tensor>,
    pub(crate) grads: HashMap<NodeId, Tensor>,
}

/// Runs the backward pass from `output`, seeded with `seed` (dL/dOutput).
///
/// Gradients arriving at a node are cast to the node's dtype and summed. Nothing is
/// written into the tensors' `grad` fields.
pub(crate) fn propagate(output: &Tensor, seed: Tensor) -> Result<GradientMap, AdvrsError> {
    let mut order = topological_sort(output)?;
    order.reverse();

    let mut grads: HashMap<NodeId, Tensor> = HashMap::new();
    grads.insert(output.node_id(), seed.to_dtype(output.dtype())?);

    for node in &order {
        let grad_fn = match node.grad_fn() {
            Some(op) => op,
            None => continue,
        };
        let grad_output = match grads.get(&node.node_id()) {
            Some(g) => g.clone(),
            None => continue,
        };
        let input_grads = grad_fn.backward(&grad_output)?;
        let inputs = grad_fn.inputs();
        if input_grads.len() != inputs.len() {
            return Err(AdvrsError::InternalError(format!(
                "{:?} returned {} gradients for {} inputs",
                grad_fn,
                input_grads.len(),
                inputs.len()
            )));
        }
        for (input, grad) in inputs.iter().zip(input_grads) {
            if !input.requires_grad() {
                continue;
            }
            let grad = grad.to_dtype(input.dtype())?;
            if grad.shape() != input.shape() {
                return Err(AdvrsError::GradientAccumulationShapeMismatch {
                    expected: input.shape(),
                    actual: grad.shape(),
                });
            }
            let id = input.node_id();
            let summed = match grads.remove(&id) {
                Some(existing) => add_op(&existing, &grad)?,
                None => grad,
            };
            grads.insert(id, summed);
        }
    }
    Ok(GradientMap { order, grads })
}
