use std::fmt;
use std::ops::Deref;

use crate::tensor::Tensor;

/// A wrapper around a Tensor marking it as a learnable parameter of a Module.
///
/// Parameters always require gradients.
#[derive(Clone)]
pub struct Parameter {
    tensor: Tensor,
    name: Option<String>,
}

impl Parameter {
    /// Creates a new Parameter, switching on `requires_grad` for the tensor.
    pub fn new(tensor: Tensor, name: Option<String>) -> Self {
        tensor.write_data().requires_grad = true;
        Parameter { tensor, name }
    }

    pub fn new_unnamed(tensor: Tensor) -> Self {
        Self::new(tensor, None)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }
}

impl Deref for Parameter {
    type Target = Tensor;

    fn deref(&self) -> &Self::Target {
        &self.tensor
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameter({:?}, {:?})", self.name, self.tensor)
    }
}
