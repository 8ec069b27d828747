use advrs_core::AdvrsError;
use thiserror::Error;

/// Errors raised by the model adapters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid shape in {operation}: expected {expected:?}, got {actual:?}")]
    InvalidShape {
        operation: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Engine error: {0}")]
    Engine(#[from] AdvrsError),
}

impl ModelError {
    pub(crate) fn invalid_shape(operation: &str, expected: Vec<usize>, actual: Vec<usize>) -> Self {
        ModelError::InvalidShape {
            operation: operation.to_string(),
            expected,
            actual,
        }
    }
}
