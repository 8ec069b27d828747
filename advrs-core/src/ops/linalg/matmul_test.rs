use super::*;
use crate::autograd::grad_check::check_grad;
use crate::utils::testing::{
    check_tensor_near, create_test_tensor, create_test_tensor_f64_with_grad,
};

#[test]
fn test_matmul_forward() {
    let a = create_test_tensor(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
    let b = create_test_tensor(vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0], vec![3, 2]);
    let c = matmul_op(&a, &b).unwrap();
    check_tensor_near(&c, &[2, 2], &[58.0, 64.0, 139.0, 154.0], 1e-5);
}

#[test]
fn test_matmul_inner_dim_mismatch() {
    let a = create_test_tensor(vec![1.0; 6], vec![2, 3]);
    let b = create_test_tensor(vec![1.0; 4], vec![2, 2]);
    assert!(matches!(matmul_op(&a, &b), Err(AdvrsError::ShapeMismatch { .. })));
}

#[test]
fn test_matmul_rank_mismatch() {
    let a = create_test_tensor(vec![1.0; 3], vec![3]);
    let b = create_test_tensor(vec![1.0; 3], vec![3, 1]);
    assert!(matches!(matmul_op(&a, &b), Err(AdvrsError::RankMismatch { .. })));
}

#[test]
fn test_matmul_backward() {
    let a = create_test_tensor_f64_with_grad(vec![0.1, 0.2, -0.3, 0.4, 0.5, -0.6], vec![2, 3]);
    let b = create_test_tensor_f64_with_grad(vec![1.0, -1.0, 0.5, 2.0, -0.7, 0.3], vec![3, 2]);
    let output_grad = Tensor::new_f64(vec![1.0, 0.5, -1.0, 2.0], vec![2, 2]).unwrap();
    check_grad(|xs: &[Tensor]| matmul_op(&xs[0], &xs[1]), &[a, b], &output_grad, 1e-6, 1e-6)
        .unwrap();
}
