use thiserror::Error;

use crate::error::AdvrsError;
use crate::tensor::Tensor;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error(
        "Gradient check failed for input {input_index}, element {element_index}: \
         analytical {analytical_grad} != numerical {numerical_grad} (difference {difference})"
    )]
    GradientMismatch {
        input_index: usize,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("Forward function execution failed during gradient check: {0}")]
    ForwardPassError(AdvrsError),
    #[error("Backward pass execution failed during gradient check: {0}")]
    BackwardPassError(AdvrsError),
    #[error("Tensor error during intermediate calculation: {0}")]
    TensorError(AdvrsError),
    #[error("Input tensor {input_index} requires grad but has no gradient after backward pass.")]
    MissingAnalyticalGrad { input_index: usize },
    #[error(
        "Numerical gradient is not finite for input {input_index}, element {element_index} \
         (loss+ {loss_plus}, loss- {loss_minus})"
    )]
    NumericalGradNotFinite {
        input_index: usize,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error(
        "Gradient check input tensor must be a leaf node (no grad_fn). Input index: {input_index}"
    )]
    InputNotLeaf { input_index: usize },
}

impl From<AdvrsError> for GradCheckError {
    fn from(err: AdvrsError) -> Self {
        GradCheckError::TensorError(err)
    }
}

/// Checks analytical gradients against central finite differences.
///
/// The scalar being differentiated is `sum(func(inputs) * output_grad)`, evaluated in f64.
/// Inputs are perturbed in their own dtype, so F32 checks need a looser `tolerance`.
/// A mismatch is reported when both the absolute and the relative difference exceed
/// `tolerance`.
pub fn check_grad<F>(
    func: F,
    inputs: &[Tensor],
    output_grad: &Tensor,
    epsilon: f64,
    tolerance: f64,
) -> Result<(), GradCheckError>
where
    F: Fn(&[Tensor]) -> Result<Tensor, AdvrsError>,
{
    for (i, input) in inputs.iter().enumerate() {
        if input.requires_grad() && input.grad_fn().is_some() {
            return Err(GradCheckError::InputNotLeaf { input_index: i });
        }
        input.clear_grad();
    }

    let output = func(inputs).map_err(GradCheckError::ForwardPassError)?;
    if output.requires_grad() {
        output
            .backward(Some(output_grad.clone()))
            .map_err(GradCheckError::BackwardPassError)?;
    }

    for (i, original_input) in inputs.iter().enumerate() {
        if !original_input.requires_grad() {
            continue;
        }
        let analytical = original_input
            .grad()
            .ok_or(GradCheckError::MissingAnalyticalGrad { input_index: i })?
            .to_f64_vec();
        let original_data = original_input.to_f64_vec();

        for elem_idx in 0..original_input.numel() {
            let loss_plus =
                perturbed_loss(&func, inputs, i, &original_data, elem_idx, epsilon, output_grad)?;
            let loss_minus =
                perturbed_loss(&func, inputs, i, &original_data, elem_idx, -epsilon, output_grad)?;
            let numerical_grad = (loss_plus - loss_minus) / (2.0 * epsilon);
            if !numerical_grad.is_finite() {
                return Err(GradCheckError::NumericalGradNotFinite {
                    input_index: i,
                    element_index: elem_idx,
                    loss_plus,
                    loss_minus,
                });
            }
            let analytical_grad = analytical[elem_idx];
            let difference = (analytical_grad - numerical_grad).abs();
            let relative = difference / (analytical_grad.abs() + epsilon);
            if difference > tolerance && relative > tolerance {
                return Err(GradCheckError::GradientMismatch {
                    input_index: i,
                    element_index: elem_idx,
                    analytical_grad,
                    numerical_grad,
                    difference,
                });
            }
        }
    }
    Ok(())
}

fn perturbed_loss<F>(
    func: &F,
    inputs: &[Tensor],
    input_index: usize,
    original_data: &[f64],
    elem_idx: usize,
    delta: f64,
    output_grad: &Tensor,
) -> Result<f64, GradCheckError>
where
    F: Fn(&[Tensor]) -> Result<Tensor, AdvrsError>,
{
    let original = &inputs[input_index];
    let mut data = original_data.to_vec();
    data[elem_idx] += delta;
    let perturbed = Tensor::new_f64(data, original.shape())?.to_dtype(original.dtype())?;
    perturbed.set_requires_grad(true)?;

    let mut perturbed_inputs = inputs.to_vec();
    perturbed_inputs[input_index] = perturbed;
    let output = func(&perturbed_inputs).map_err(GradCheckError::ForwardPassError)?;
    weighted_sum(&output, output_grad)
}

fn weighted_sum(output: &Tensor, output_grad: &Tensor) -> Result<f64, GradCheckError> {
    if output.shape() != output_grad.shape() {
        return Err(GradCheckError::TensorError(AdvrsError::ShapeMismatch {
            expected: output.shape(),
            actual: output_grad.shape(),
            operation: "check_grad".to_string(),
        }));
    }
    Ok(output
        .to_f64_vec()
        .iter()
        .zip(output_grad.to_f64_vec().iter())
        .map(|(o, g)| o * g)
        .sum())
}
