//! # advrs-models
//!
//! Wraps trained classifiers behind one [`DifferentiableModel`] interface that attack
//! algorithms use to query logits and input gradients. Inputs are normalized by a
//! [`Preprocessing`] transform before reaching the engine, and every gradient is mapped
//! back to the raw input space.

pub mod backends;
pub mod base;
pub mod bounds;
pub mod config;
pub mod convention;
pub mod error;
pub mod model;
pub mod preprocessing;

#[cfg(feature = "graph")]
pub use backends::graph::GraphModel;
#[cfg(feature = "layers")]
pub use backends::layers::LayerModel;
#[cfg(feature = "tape")]
pub use backends::tape::TapeModel;
pub use bounds::Bounds;
pub use config::ModelConfig;
pub use convention::{LogitsStrategy, OutputConvention};
pub use error::ModelError;
pub use model::DifferentiableModel;
pub use preprocessing::Preprocessing;
