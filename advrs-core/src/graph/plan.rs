use std::sync::Arc;

use log::debug;

use super::{Graph, NodeIndex, Op};
use crate::error::AdvrsError;
use crate::ops::activation::{relu_op, softmax_op};
use crate::ops::arithmetic::add_op;
use crate::ops::linalg::matmul_op;
use crate::tensor::Tensor;

/// A compiled evaluation schedule for a fixed set of target nodes.
///
/// The schedule is computed once; [`Plan::run`] only evaluates the nodes the targets
/// depend on, in graph order.
#[derive(Debug, Clone)]
pub struct Plan {
    graph: Arc<Graph>,
    targets: Vec<NodeIndex>,
    schedule: Vec<NodeIndex>,
}

impl Plan {
    pub(super) fn new(graph: Arc<Graph>, targets: &[NodeIndex]) -> Result<Self, AdvrsError> {
        let mut needed = vec![false; graph.len()];
        for target in targets {
            if target.0 >= graph.len() {
                return Err(AdvrsError::InvalidGraph(format!("unknown target node {}", target.0)));
            }
            let mut cursor = Some(*target);
            while let Some(node) = cursor {
                if needed[node.0] {
                    break;
                }
                needed[node.0] = true;
                cursor = graph.nodes[node.0].op.input();
            }
        }
        // Nodes only read earlier nodes, so index order is a valid schedule.
        let schedule = needed
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n)
            .map(|(i, _)| NodeIndex(i))
            .collect();
        Ok(Plan {
            graph,
            targets: targets.to_vec(),
            schedule,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn targets(&self) -> &[NodeIndex] {
        &self.targets
    }

    /// Evaluates the plan on a batch and returns one tensor per target.
    ///
    /// # Errors
    /// `ShapeMismatch` if `input` is not `[N, ..input_shape]`, plus any op error.
    pub fn run(&self, input: &Tensor) -> Result<Vec<Tensor>, AdvrsError> {
        let expected = self.graph.input_shape();
        let actual = input.shape();
        if actual.len() != expected.len() + 1 || actual[1..] != expected[..] {
            let mut full = vec![actual.first().copied().unwrap_or(0)];
            full.extend_from_slice(&expected);
            return Err(AdvrsError::ShapeMismatch {
                expected: full,
                actual,
                operation: "Plan::run".to_string(),
            });
        }
        debug!("running plan for {} target(s) on input {:?}", self.targets.len(), actual);

        let mut values: Vec<Option<Tensor>> = vec![None; self.graph.len()];
        for &node in &self.schedule {
            let op = &self.graph.nodes[node.0].op;
            let value = match op.input() {
                None => input.clone(),
                Some(src) => {
                    let x = values[src.0].as_ref().ok_or_else(|| {
                        let message = format!("node {} scheduled before its input", node.0);
                        AdvrsError::InternalError(message)
                    })?;
                    evaluate(op, x)?
                }
            };
            values[node.0] = Some(value);
        }

        self.targets
            .iter()
            .map(|t| {
                values[t.0].clone().ok_or_else(|| {
                    AdvrsError::InternalError(format!("target {} was not evaluated", t.0))
                })
            })
            .collect()
    }
}

fn dense(x: &Tensor, weight: &Tensor, bias: &Tensor) -> Result<Tensor, AdvrsError> {
    add_op(&matmul_op(x, weight)?, bias)
}

fn evaluate(op: &Op, x: &Tensor) -> Result<Tensor, AdvrsError> {
    match op {
        Op::Input => Ok(x.clone()),
        Op::Flatten { .. } => {
            let shape = x.shape();
            let batch = shape.first().copied().unwrap_or(1);
            let features: usize = shape.iter().skip(1).product();
            x.reshape(vec![batch, features])
        }
        Op::Dense { weight, bias, .. } => dense(x, weight, bias),
        Op::Relu { .. } => relu_op(x),
        Op::Softmax { .. } => softmax_op(x),
        Op::DenseSoftmax { weight, bias, .. } => softmax_op(&dense(x, weight, bias)?),
        Op::Lambda { name, width, func, .. } => {
            let out = func(x)?;
            let shape = out.shape();
            let batch_ok = shape.first() == x.shape().first();
            let width_ok = width.map_or(true, |w| shape.len() == 2 && shape[1] == w);
            if !batch_ok || !width_ok {
                return Err(AdvrsError::InvalidGraph(format!(
                    "lambda '{}' produced shape {:?}, declared [N, {:?}]",
                    name, shape, width
                )));
            }
            Ok(out)
        }
    }
}
