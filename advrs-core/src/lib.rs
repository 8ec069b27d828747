//! # advrs-core
//!
//! Reference CPU tensor engine with reverse-mode automatic differentiation.
//!
//! It provides the tensors, differentiable ops, `nn` modules and declared computation
//! graphs that the `advrs-models` adapters wrap.

pub mod autograd;
pub mod buffer;
pub mod engine;
pub mod error;
pub mod graph;
pub mod nn;
pub mod ops;
pub mod tensor;
pub mod tensor_data;
pub mod types;
pub mod utils;

pub use error::AdvrsError;
pub use tensor::Tensor;
pub use types::DType;
// Re-export traits required by public generic functions
pub use num_traits;
