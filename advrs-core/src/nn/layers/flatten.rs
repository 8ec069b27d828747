use crate::error::AdvrsError;
use crate::nn::module::{DeclaredShape, Module};
use crate::tensor::Tensor;

/// Flattens every axis after the first: `[N, d1, d2, ...] -> [N, d1 * d2 * ...]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Flatten;

impl Flatten {
    pub fn new() -> Self {
        Flatten
    }
}

impl Module for Flatten {
    fn forward(&self, input: &Tensor) -> Result<Tensor, AdvrsError> {
        let shape = input.shape();
        match shape.split_first() {
            Some((&batch, rest)) => input.reshape(vec![batch, rest.iter().product()]),
            None => Err(AdvrsError::RankMismatch {
                expected: 1,
                actual: 0,
                operation: "Flatten::forward".to_string(),
            }),
        }
    }

    fn output_shape(&self, input_shape: &[Option<usize>]) -> Result<DeclaredShape, AdvrsError> {
        match input_shape.split_first() {
            Some((&batch, rest)) => {
                let features = rest.iter().try_fold(1usize, |acc, d| d.map(|d| acc * d));
                Ok(vec![batch, features])
            }
            None => Err(AdvrsError::RankMismatch {
                expected: 1,
                actual: 0,
                operation: "Flatten::output_shape".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten() {
        let x = Tensor::new(vec![0.0; 24], vec![2, 3, 4]).unwrap();
        assert_eq!(Flatten.forward(&x).unwrap().shape(), vec![2, 12]);
        assert_eq!(
            Flatten.output_shape(&[None, Some(3), Some(4)]).unwrap(),
            vec![None, Some(12)]
        );
        assert_eq!(Flatten.output_shape(&[None, None, Some(4)]).unwrap(), vec![None, None]);
    }
}
