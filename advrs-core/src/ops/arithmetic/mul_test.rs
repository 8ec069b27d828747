use super::*;
use crate::autograd::grad_check::check_grad;
use crate::utils::testing::{
    check_tensor_near, create_test_tensor, create_test_tensor_f64_with_grad,
};

#[test]
fn test_mul_forward() {
    let a = create_test_tensor(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    let b = create_test_tensor(vec![2.0, 0.5], vec![1, 2]);
    let result = mul_op(&a, &b).unwrap();
    check_tensor_near(&result, &[2, 2], &[2.0, 1.0, 6.0, 2.0], 1e-6);
}

#[test]
fn test_mul_backward() {
    let a = create_test_tensor_f64_with_grad(vec![1.0, -2.0, 3.0, 0.5], vec![2, 2]);
    let b = create_test_tensor_f64_with_grad(vec![0.7, -1.3], vec![2, 1]);
    let output_grad = Tensor::new_f64(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
    check_grad(|xs: &[Tensor]| mul_op(&xs[0], &xs[1]), &[a, b], &output_grad, 1e-6, 1e-7).unwrap();
}

#[test]
fn test_mul_self() {
    let a = create_test_tensor_f64_with_grad(vec![3.0], vec![1]);
    let y = mul_op(&a, &a).unwrap();
    y.backward(None).unwrap();
    assert_eq!(a.grad().unwrap().get_f64_data().unwrap(), vec![6.0]);
}
