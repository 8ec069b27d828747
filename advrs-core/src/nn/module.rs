use crate::error::AdvrsError;
use crate::nn::Parameter;
use crate::tensor::Tensor;

/// Declared tensor shape; `None` marks a dimension unknown until run time (the batch).
pub type DeclaredShape = Vec<Option<usize>>;

/// The base trait for all neural network modules (layers, containers, etc.).
pub trait Module: std::fmt::Debug + Send + Sync {
    /// Performs a forward pass of the module.
    fn forward(&self, input: &Tensor) -> Result<Tensor, AdvrsError>;

    /// Returns all learnable parameters, including those of sub-modules.
    fn parameters(&self) -> Vec<Parameter> {
        Vec::new()
    }

    /// Returns all learnable parameters with hierarchical names such as `"fc1.weight"`.
    fn named_parameters(&self) -> Vec<(String, Parameter)> {
        Vec::new()
    }

    /// Infers the declared output shape from a declared input shape.
    ///
    /// The default is the identity, correct for element-wise layers.
    fn output_shape(&self, input_shape: &[Option<usize>]) -> Result<DeclaredShape, AdvrsError> {
        Ok(input_shape.to_vec())
    }
}
