//! Declared computation graphs.
//!
//! A [`Graph`] is built once with a [`GraphBuilder`], carries declared shapes for every
//! node (the batch dimension is unknown), and is compiled into [`Plan`]s that evaluate a
//! fixed set of target nodes.

mod plan;

pub use plan::Plan;

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use semver::Version;

use crate::error::AdvrsError;
use crate::nn::init::kaiming_uniform;
use crate::nn::module::DeclaredShape;
use crate::nn::Parameter;
use crate::tensor::Tensor;
use crate::types::DType;

/// User closure evaluated by a `Lambda` node.
pub type LambdaFn = Arc<dyn Fn(&Tensor) -> Result<Tensor, AdvrsError> + Send + Sync>;

/// Format version written by this engine when none is set explicitly.
pub fn current_format_version() -> Version {
    Version::new(0, 1, 0)
}

/// Position of a node inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Graph operations. Every non-input op reads exactly one earlier node.
#[derive(Clone)]
pub enum Op {
    Input,
    Flatten {
        input: NodeIndex,
    },
    /// `x @ weight + bias`, with `weight` of shape `[in, out]`.
    Dense {
        input: NodeIndex,
        weight: Parameter,
        bias: Parameter,
    },
    Relu {
        input: NodeIndex,
    },
    /// Softmax over the last axis. Its input is the pre-activation node.
    Softmax {
        input: NodeIndex,
    },
    /// Dense followed by softmax in one node; the pre-activation is never materialized
    /// as a node of its own.
    DenseSoftmax {
        input: NodeIndex,
        weight: Parameter,
        bias: Parameter,
    },
    /// Arbitrary closure. `width` is the declared trailing dimension, `None` when unknown.
    Lambda {
        input: NodeIndex,
        name: String,
        width: Option<usize>,
        func: LambdaFn,
    },
}

impl Op {
    pub fn input(&self) -> Option<NodeIndex> {
        match self {
            Op::Input => None,
            Op::Flatten { input }
            | Op::Dense { input, .. }
            | Op::Relu { input }
            | Op::Softmax { input }
            | Op::DenseSoftmax { input, .. }
            | Op::Lambda { input, .. } => Some(*input),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Op::Input => "input",
            Op::Flatten { .. } => "flatten",
            Op::Dense { .. } => "dense",
            Op::Relu { .. } => "relu",
            Op::Softmax { .. } => "softmax",
            Op::DenseSoftmax { .. } => "dense_softmax",
            Op::Lambda { name, .. } => name.as_str(),
        }
    }
}

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.input() {
            Some(input) => write!(f, "{}({})", self.name(), input.0),
            None => write!(f, "{}", self.name()),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    op: Op,
    shape: DeclaredShape,
}

/// Incrementally declares a graph, inferring the declared shape of every node.
#[derive(Debug)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    format_version: Version,
}

impl GraphBuilder {
    /// Starts a graph whose input has per-example shape `input_shape`.
    pub fn new(input_shape: &[usize]) -> Self {
        let mut shape = vec![None];
        shape.extend(input_shape.iter().map(|&d| Some(d)));
        GraphBuilder {
            nodes: vec![Node { op: Op::Input, shape }],
            format_version: current_format_version(),
        }
    }

    pub fn input(&self) -> NodeIndex {
        NodeIndex(0)
    }

    pub fn with_format_version(mut self, version: Version) -> Self {
        self.format_version = version;
        self
    }

    fn shape(&self, node: NodeIndex) -> Result<&DeclaredShape, AdvrsError> {
        self.nodes
            .get(node.0)
            .map(|n| &n.shape)
            .ok_or_else(|| AdvrsError::InvalidGraph(format!("unknown node {}", node.0)))
    }

    fn push(&mut self, op: Op, shape: DeclaredShape) -> NodeIndex {
        self.nodes.push(Node { op, shape });
        NodeIndex(self.nodes.len() - 1)
    }

    fn dense_shape(
        &self,
        input: NodeIndex,
        weight: &Tensor,
        bias: &Tensor,
    ) -> Result<DeclaredShape, AdvrsError> {
        let shape = self.shape(input)?;
        let (batch, features) = match shape.as_slice() {
            [batch, features] => (*batch, *features),
            _ => {
                return Err(AdvrsError::RankMismatch {
                    expected: 2,
                    actual: shape.len(),
                    operation: "GraphBuilder::dense".to_string(),
                })
            }
        };
        let w_shape = weight.shape();
        if w_shape.len() != 2 || features.map_or(false, |f| f != w_shape[0]) {
            return Err(AdvrsError::ShapeMismatch {
                expected: vec![features.unwrap_or(0), w_shape.get(1).copied().unwrap_or(0)],
                actual: w_shape,
                operation: "GraphBuilder::dense".to_string(),
            });
        }
        if bias.shape() != [w_shape[1]] {
            return Err(AdvrsError::ShapeMismatch {
                expected: vec![w_shape[1]],
                actual: bias.shape(),
                operation: "GraphBuilder::dense".to_string(),
            });
        }
        Ok(vec![batch, Some(w_shape[1])])
    }

    pub fn flatten(&mut self, input: NodeIndex) -> Result<NodeIndex, AdvrsError> {
        let shape = self.shape(input)?;
        let (batch, rest) = shape
            .split_first()
            .ok_or_else(|| AdvrsError::InvalidGraph("flatten of a rank-0 node".to_string()))?;
        let features = rest.iter().try_fold(1usize, |acc, d| d.map(|d| acc * d));
        let declared = vec![*batch, features];
        Ok(self.push(Op::Flatten { input }, declared))
    }

    /// Adds a dense layer with explicit `weight` `[in, out]` and `bias` `[out]`.
    pub fn dense(
        &mut self,
        input: NodeIndex,
        weight: Tensor,
        bias: Tensor,
    ) -> Result<NodeIndex, AdvrsError> {
        let declared = self.dense_shape(input, &weight, &bias)?;
        let op = Op::Dense {
            input,
            weight: Parameter::new(weight, Some("kernel".to_string())),
            bias: Parameter::new(bias, Some("bias".to_string())),
        };
        Ok(self.push(op, declared))
    }

    /// Adds a dense layer of `units` outputs with Kaiming-uniform parameters.
    pub fn dense_init<R: Rng + ?Sized>(
        &mut self,
        input: NodeIndex,
        units: usize,
        dtype: DType,
        rng: &mut R,
    ) -> Result<NodeIndex, AdvrsError> {
        let (weight, bias) = self.random_dense_params(input, units, dtype, rng)?;
        self.dense(input, weight, bias)
    }

    fn random_dense_params<R: Rng + ?Sized>(
        &self,
        input: NodeIndex,
        units: usize,
        dtype: DType,
        rng: &mut R,
    ) -> Result<(Tensor, Tensor), AdvrsError> {
        let fan_in = match self.shape(input)?.as_slice() {
            [_, Some(features)] => *features,
            other => {
                return Err(AdvrsError::InvalidGraph(format!(
                    "dense layer needs a known feature dimension, got {:?}",
                    other
                )))
            }
        };
        let weight = kaiming_uniform(&[fan_in, units], fan_in, dtype, rng)?;
        let bias = kaiming_uniform(&[units], fan_in, dtype, rng)?;
        Ok((weight, bias))
    }

    pub fn relu(&mut self, input: NodeIndex) -> Result<NodeIndex, AdvrsError> {
        let declared = self.shape(input)?.clone();
        Ok(self.push(Op::Relu { input }, declared))
    }

    pub fn softmax(&mut self, input: NodeIndex) -> Result<NodeIndex, AdvrsError> {
        let declared = self.shape(input)?.clone();
        if declared.len() < 2 {
            return Err(AdvrsError::InvalidGraph("softmax needs a class axis".to_string()));
        }
        Ok(self.push(Op::Softmax { input }, declared))
    }

    /// Adds a fused dense + softmax node.
    pub fn dense_softmax(
        &mut self,
        input: NodeIndex,
        weight: Tensor,
        bias: Tensor,
    ) -> Result<NodeIndex, AdvrsError> {
        let declared = self.dense_shape(input, &weight, &bias)?;
        let op = Op::DenseSoftmax {
            input,
            weight: Parameter::new(weight, Some("kernel".to_string())),
            bias: Parameter::new(bias, Some("bias".to_string())),
        };
        Ok(self.push(op, declared))
    }

    /// Fused dense + softmax with Kaiming-uniform parameters.
    pub fn dense_softmax_init<R: Rng + ?Sized>(
        &mut self,
        input: NodeIndex,
        units: usize,
        dtype: DType,
        rng: &mut R,
    ) -> Result<NodeIndex, AdvrsError> {
        let (weight, bias) = self.random_dense_params(input, units, dtype, rng)?;
        self.dense_softmax(input, weight, bias)
    }

    /// Adds a closure node producing `[batch, width]`; `width = None` leaves it undeclared.
    pub fn lambda<F>(
        &mut self,
        input: NodeIndex,
        name: &str,
        width: Option<usize>,
        func: F,
    ) -> Result<NodeIndex, AdvrsError>
    where
        F: Fn(&Tensor) -> Result<Tensor, AdvrsError> + Send + Sync + 'static,
    {
        let batch = self
            .shape(input)?
            .first()
            .copied()
            .ok_or_else(|| AdvrsError::InvalidGraph("lambda on a rank-0 node".to_string()))?;
        let op = Op::Lambda {
            input,
            name: name.to_string(),
            width,
            func: Arc::new(func),
        };
        Ok(self.push(op, vec![batch, width]))
    }

    /// Finishes the graph with `output` as its output node.
    pub fn build(self, output: NodeIndex) -> Result<Graph, AdvrsError> {
        if output.0 >= self.nodes.len() {
            return Err(AdvrsError::InvalidGraph(format!("unknown output node {}", output.0)));
        }
        Ok(Graph {
            nodes: self.nodes,
            output,
            format_version: self.format_version,
        })
    }
}

/// An immutable declared computation graph with one input and one output.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    output: NodeIndex,
    format_version: Version,
}

impl Graph {
    pub fn input(&self) -> NodeIndex {
        NodeIndex(0)
    }

    pub fn output(&self) -> NodeIndex {
        self.output
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&Op> {
        self.nodes.get(index.0).map(|n| &n.op)
    }

    /// Per-example input shape (without the batch axis).
    pub fn input_shape(&self) -> Vec<usize> {
        self.nodes[0].shape.iter().skip(1).map(|d| d.unwrap_or(0)).collect()
    }

    pub fn shape_of(&self, index: NodeIndex) -> Option<&[Option<usize>]> {
        self.nodes.get(index.0).map(|n| n.shape.as_slice())
    }

    pub fn output_shape(&self) -> &[Option<usize>] {
        &self.nodes[self.output.0].shape
    }

    pub fn format_version(&self) -> &Version {
        &self.format_version
    }

    /// The node feeding a literal softmax, i.e. the logits behind `index`.
    ///
    /// `None` for every other op, fused `DenseSoftmax` included.
    pub fn pre_activation(&self, index: NodeIndex) -> Option<NodeIndex> {
        match self.node(index)? {
            Op::Softmax { input } => Some(*input),
            _ => None,
        }
    }

    /// All parameters held by the graph's nodes.
    pub fn parameters(&self) -> Vec<Parameter> {
        self.nodes
            .iter()
            .flat_map(|n| match &n.op {
                Op::Dense { weight, bias, .. } | Op::DenseSoftmax { weight, bias, .. } => {
                    vec![weight.clone(), bias.clone()]
                }
                _ => Vec::new(),
            })
            .collect()
    }

    /// Schedules the nodes needed to compute `targets`.
    ///
    /// # Errors
    /// `InvalidGraph` if a target is not a node of this graph.
    pub fn compile(self: &Arc<Self>, targets: &[NodeIndex]) -> Result<Plan, AdvrsError> {
        Plan::new(Arc::clone(self), targets)
    }
}
