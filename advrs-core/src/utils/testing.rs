use crate::tensor::Tensor;

/// Checks that `actual` has `expected_shape` and element values within `tolerance`.
///
/// Works for both dtypes by widening to f64. Panics on mismatch.
pub fn check_tensor_near(
    actual: &Tensor,
    expected_shape: &[usize],
    expected_data: &[f64],
    tolerance: f64,
) {
    assert_eq!(actual.shape(), expected_shape, "Shape mismatch");
    let actual_data = actual.to_f64_vec();
    assert_eq!(actual_data.len(), expected_data.len(), "Data length mismatch");
    for (i, (a, e)) in actual_data.iter().zip(expected_data.iter()).enumerate() {
        let diff = (a - e).abs();
        if diff > tolerance {
            panic!(
                "Data mismatch at index {}: actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
                i, a, e, diff, tolerance
            );
        }
    }
}

/// Helper to create a simple f32 tensor for testing purposes.
pub(crate) fn create_test_tensor(data: Vec<f32>, shape: Vec<usize>) -> Tensor {
    Tensor::new(data, shape).expect("Failed to create test tensor")
}

/// Helper to create an f32 tensor that requires gradient.
pub(crate) fn create_test_tensor_with_grad(data: Vec<f32>, shape: Vec<usize>) -> Tensor {
    let tensor = create_test_tensor(data, shape);
    tensor.write_data().requires_grad = true;
    tensor
}

/// Helper to create an f64 tensor that requires gradient, for gradient checks.
pub(crate) fn create_test_tensor_f64_with_grad(data: Vec<f64>, shape: Vec<usize>) -> Tensor {
    let tensor = Tensor::new_f64(data, shape).expect("Failed to create test tensor with grad");
    tensor.write_data().requires_grad = true;
    tensor
}
