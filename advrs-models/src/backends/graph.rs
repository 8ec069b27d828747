//! Adapter for declared computation graphs.

use std::sync::Arc;

use advrs_core::engine;
use advrs_core::graph::{Graph, NodeIndex, Plan};
use advrs_core::ops::loss::sparse_cross_entropy_op;
use advrs_core::ops::view::select_op;
use advrs_core::Tensor;
use log::{debug, info, warn};
use semver::Version;

use crate::base::{
    check_input, check_labels, check_predictions, check_upstream, class_count,
    cross_entropy_gradient, logits_vjp, ModelBase,
};
use crate::config::ModelConfig;
use crate::convention::{log_clip, LogitsStrategy, OutputConvention};
use crate::error::ModelError;
use crate::model::{add_batch_axis, DifferentiableModel};

/// Wraps a [`Graph`] whose output is either logits or softmax probabilities.
#[derive(Debug)]
pub struct GraphModel {
    base: ModelBase,
    graph: Arc<Graph>,
    strategy: LogitsStrategy,
    logits_source: NodeIndex,
    num_classes: usize,
    plan: Plan,
}

/// Graph format versions older than this are not understood by any engine.
fn minimum_format_version() -> Version {
    Version::new(0, 1, 0)
}

fn check_format_version(format: &Version, engine: &Version) -> Result<(), ModelError> {
    if *format < minimum_format_version() || format > engine {
        return Err(ModelError::Configuration(format!(
            "graph format version {} is not supported by engine {} (need >= {})",
            format,
            engine,
            minimum_format_version()
        )));
    }
    Ok(())
}

impl GraphModel {
    pub const DEFAULT_CHANNEL_AXIS: usize = 3;

    /// Wraps a graph whose output is probabilities.
    pub fn new(graph: Arc<Graph>, config: ModelConfig) -> Result<Self, ModelError> {
        Self::with_convention(graph, config, OutputConvention::default())
    }

    /// Wraps a graph whose output follows `convention`.
    ///
    /// # Errors
    /// `Configuration` if the graph format version is outside `[0.1.0, engine version]`
    /// or the output is not declared as `[batch, classes]`.
    pub fn with_convention(
        graph: Arc<Graph>,
        config: ModelConfig,
        convention: OutputConvention,
    ) -> Result<Self, ModelError> {
        let engine = engine::acquire()?;
        check_format_version(graph.format_version(), &engine.version)?;
        let num_classes = class_count(graph.output_shape())?;

        let output = graph.output();
        let (strategy, logits_source) = match convention {
            OutputConvention::Logits => (LogitsStrategy::Native, output),
            OutputConvention::Probabilities => match graph.pre_activation(output) {
                Some(pre) => (LogitsStrategy::PreActivation, pre),
                None => {
                    warn!(
                        "graph output is not a separate softmax node; \
                         recovering logits as ln(clip(p)), which is numerically unstable"
                    );
                    (LogitsStrategy::LogClip, output)
                }
            },
        };
        let plan = graph.compile(&[logits_source])?;
        info!(
            "graph model ready: {} classes, {:?} logits, format {}",
            num_classes,
            strategy,
            graph.format_version()
        );
        Ok(GraphModel {
            base: ModelBase::new(config, Self::DEFAULT_CHANNEL_AXIS),
            graph,
            strategy,
            logits_source,
            num_classes,
            plan,
        })
    }

    pub fn strategy(&self) -> LogitsStrategy {
        self.strategy
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The node whose value the logits are derived from.
    pub fn logits_source(&self) -> NodeIndex {
        self.logits_source
    }

    /// Logits `[batch, C]` for a normalized batch; any other shape is `InvalidShape`.
    fn logits(
        &self,
        normalized: &Tensor,
        batch: usize,
        operation: &str,
    ) -> Result<Tensor, ModelError> {
        let mut outputs = self.plan.run(normalized)?;
        let raw = outputs
            .pop()
            .ok_or_else(|| ModelError::Configuration("compiled plan has no target".to_string()))?;
        let logits = match self.strategy {
            LogitsStrategy::LogClip => log_clip(&raw)?,
            LogitsStrategy::Native | LogitsStrategy::PreActivation => raw,
        };
        check_predictions(&logits, batch, self.num_classes, operation)?;
        Ok(logits)
    }

    fn check_input(&self, images: &Tensor, operation: &str) -> Result<usize, ModelError> {
        check_input(images, &self.graph.input_shape(), operation)
    }
}

impl DifferentiableModel for GraphModel {
    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn batch_predictions(&self, images: &Tensor) -> Result<Tensor, ModelError> {
        let n = self.check_input(images, "batch_predictions")?;
        debug!("graph batch_predictions on {:?}", images.shape());
        let (normalized, _) = self.base.process_input(images, false)?;
        let logits = self.logits(&normalized, n, "batch_predictions")?;
        Ok(logits.detach())
    }

    fn predictions_and_gradient(
        &self,
        image: &Tensor,
        label: usize,
    ) -> Result<(Tensor, Tensor), ModelError> {
        let batch = add_batch_axis(image)?;
        self.check_input(&batch, "predictions_and_gradient")?;
        check_labels(&[label], 1, self.num_classes, "predictions_and_gradient")?;
        debug!("graph predictions_and_gradient on {:?}, label {}", image.shape(), label);

        let (normalized, scale) = self.base.process_input(&batch, true)?;
        let logits = self.logits(&normalized, 1, "predictions_and_gradient")?;
        let gradient = cross_entropy_gradient(&logits, &normalized, &[label])?;
        let gradient = self.base.process_gradient(&batch, &scale, &gradient)?;
        Ok((select_op(&logits.detach(), 0)?, gradient.reshape(image.shape())?))
    }

    fn batch_gradients(&self, images: &Tensor, labels: &[usize]) -> Result<Tensor, ModelError> {
        let n = self.check_input(images, "batch_gradients")?;
        check_labels(labels, n, self.num_classes, "batch_gradients")?;
        debug!("graph batch_gradients on {:?}", images.shape());

        let (normalized, scale) = self.base.process_input(images, true)?;
        let logits = self.logits(&normalized, n, "batch_gradients")?;
        let gradient = cross_entropy_gradient(&logits, &normalized, labels)?;
        self.base.process_gradient(images, &scale, &gradient)
    }

    fn batch_backward(&self, gradients: &Tensor, images: &Tensor) -> Result<Tensor, ModelError> {
        let n = self.check_input(images, "batch_backward")?;
        check_upstream(gradients, n, self.num_classes)?;
        debug!("graph batch_backward on {:?}", images.shape());

        let (normalized, scale) = self.base.process_input(images, true)?;
        let logits = self.logits(&normalized, n, "batch_backward")?;
        let gradient = logits_vjp(&logits, &normalized, gradients)?;
        self.base.process_gradient(images, &scale, &gradient)
    }

    fn loss(&self, image: &Tensor, label: usize) -> Result<f64, ModelError> {
        let batch = add_batch_axis(image)?;
        self.check_input(&batch, "loss")?;
        check_labels(&[label], 1, self.num_classes, "loss")?;
        let (normalized, _) = self.base.process_input(&batch, false)?;
        let logits = self.logits(&normalized, 1, "loss")?;
        Ok(sparse_cross_entropy_op(&logits, &[label])?.item()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advrs_core::graph::current_format_version;

    #[test]
    fn test_format_version_range() {
        let engine = Version::new(0, 3, 0);
        assert!(check_format_version(&current_format_version(), &engine).is_ok());
        assert!(check_format_version(&Version::new(0, 3, 0), &engine).is_ok());
        assert!(check_format_version(&Version::new(0, 0, 9), &engine).is_err());
        assert!(check_format_version(&Version::new(0, 4, 0), &engine).is_err());
    }
}
