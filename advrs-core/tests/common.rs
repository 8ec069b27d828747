use advrs_core::Tensor;

// Shared by several test crates; not every helper is used by each one.
#[allow(dead_code)]
pub(crate) fn create_test_tensor(data: Vec<f32>, shape: Vec<usize>) -> Tensor {
    Tensor::new(data, shape).expect("Test tensor creation failed")
}

#[allow(dead_code)]
pub(crate) fn create_leaf_f64(data: Vec<f64>, shape: Vec<usize>) -> Tensor {
    let t = Tensor::new_f64(data, shape).expect("Test tensor creation failed");
    t.set_requires_grad(true).expect("set_requires_grad failed");
    t
}
