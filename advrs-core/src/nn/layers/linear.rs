use rand::Rng;

use crate::error::AdvrsError;
use crate::nn::init::kaiming_uniform;
use crate::nn::module::{DeclaredShape, Module};
use crate::nn::parameter::Parameter;
use crate::ops::arithmetic::add_op;
use crate::ops::linalg::{matmul_op, transpose_op};
use crate::tensor::Tensor;
use crate::types::DType;

/// Applies a linear transformation to the incoming data: `y = x W^T + b`.
///
/// `weight` has shape `[out_features, in_features]`, `bias` `[out_features]`.
#[derive(Debug)]
pub struct Linear {
    weight: Parameter,
    bias: Option<Parameter>,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Creates a layer with Kaiming-uniform weights and bias drawn from `rng`.
    pub fn new<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        has_bias: bool,
        dtype: DType,
        rng: &mut R,
    ) -> Result<Self, AdvrsError> {
        let weight = kaiming_uniform(&[out_features, in_features], in_features, dtype, rng)?;
        let bias = if has_bias {
            Some(kaiming_uniform(&[out_features], in_features, dtype, rng)?)
        } else {
            None
        };
        Self::from_tensors(weight, bias)
    }

    /// Wraps existing weight and bias tensors.
    ///
    /// # Errors
    /// `RankMismatch`/`ShapeMismatch` if the tensors are not `[out, in]` and `[out]`.
    pub fn from_tensors(weight: Tensor, bias: Option<Tensor>) -> Result<Self, AdvrsError> {
        let shape = weight.shape();
        if shape.len() != 2 {
            return Err(AdvrsError::RankMismatch {
                expected: 2,
                actual: shape.len(),
                operation: "Linear::from_tensors".to_string(),
            });
        }
        let (out_features, in_features) = (shape[0], shape[1]);
        if let Some(b) = &bias {
            if b.shape() != [out_features] {
                return Err(AdvrsError::ShapeMismatch {
                    expected: vec![out_features],
                    actual: b.shape(),
                    operation: "Linear::from_tensors".to_string(),
                });
            }
        }
        Ok(Linear {
            weight: Parameter::new(weight, Some("weight".to_string())),
            bias: bias.map(|b| Parameter::new(b, Some("bias".to_string()))),
            in_features,
            out_features,
        })
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn weight(&self) -> &Parameter {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Parameter> {
        self.bias.as_ref()
    }
}

impl Module for Linear {
    fn forward(&self, input: &Tensor) -> Result<Tensor, AdvrsError> {
        let output = matmul_op(input, &transpose_op(&self.weight)?)?;
        match &self.bias {
            Some(bias) => add_op(&output, bias),
            None => Ok(output),
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        let mut params = vec![self.weight.clone()];
        params.extend(self.bias.iter().cloned());
        params
    }

    fn named_parameters(&self) -> Vec<(String, Parameter)> {
        self.parameters()
            .into_iter()
            .map(|p| (p.name().unwrap_or("param").to_string(), p))
            .collect()
    }

    fn output_shape(&self, input_shape: &[Option<usize>]) -> Result<DeclaredShape, AdvrsError> {
        match input_shape {
            [batch, features] => {
                if let Some(f) = features {
                    if *f != self.in_features {
                        return Err(AdvrsError::ShapeMismatch {
                            expected: vec![self.in_features],
                            actual: vec![*f],
                            operation: "Linear::output_shape".to_string(),
                        });
                    }
                }
                Ok(vec![*batch, Some(self.out_features)])
            }
            _ => Err(AdvrsError::RankMismatch {
                expected: 2,
                actual: input_shape.len(),
                operation: "Linear::output_shape".to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "linear_test.rs"]
mod tests;
