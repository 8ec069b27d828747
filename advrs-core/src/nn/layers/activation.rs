use crate::error::AdvrsError;
use crate::nn::module::Module;
use crate::ops::activation::{relu_op, softmax_op};
use crate::tensor::Tensor;

/// Element-wise ReLU layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Relu;

impl Relu {
    pub fn new() -> Self {
        Relu
    }
}

impl Module for Relu {
    fn forward(&self, input: &Tensor) -> Result<Tensor, AdvrsError> {
        relu_op(input)
    }
}

/// Softmax over the last axis.
#[derive(Debug, Default, Clone, Copy)]
pub struct Softmax;

impl Softmax {
    pub fn new() -> Self {
        Softmax
    }
}

impl Module for Softmax {
    fn forward(&self, input: &Tensor) -> Result<Tensor, AdvrsError> {
        softmax_op(input)
    }
}
