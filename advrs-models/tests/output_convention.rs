use std::sync::Arc;

use advrs_core::graph::{Graph, GraphBuilder};
use advrs_core::ops::activation::softmax_op;
use advrs_core::ops::view::select_op;
use advrs_core::{DType, Tensor};
use advrs_models::{DifferentiableModel, GraphModel, LogitsStrategy, OutputConvention};
use approx::assert_abs_diff_eq;

mod common;
use common::*;

const FEATURES: usize = 3;

fn small_weights() -> (Tensor, Tensor) {
    let weight: Vec<f64> = (0..FEATURES * CLASSES).map(|i| 0.1 * ((i % 5) as f64 - 2.0)).collect();
    let bias = vec![0.05, -0.05, 0.1, 0.0];
    (
        Tensor::new_f64(weight, vec![FEATURES, CLASSES]).unwrap(),
        Tensor::new_f64(bias, vec![CLASSES]).unwrap(),
    )
}

fn explicit_graph(fused: bool) -> Arc<Graph> {
    let (weight, bias) = small_weights();
    let mut b = GraphBuilder::new(&[FEATURES]);
    let x = b.input();
    let out = if fused {
        b.dense_softmax(x, weight, bias).unwrap()
    } else {
        let logits = b.dense(x, weight, bias).unwrap();
        b.softmax(logits).unwrap()
    };
    Arc::new(b.build(out).unwrap())
}

fn centered_rows(values: &[f64]) -> Vec<f64> {
    values
        .chunks(CLASSES)
        .flat_map(|row| {
            let mean = row.iter().sum::<f64>() / row.len() as f64;
            row.iter().map(move |v| v - mean)
        })
        .collect()
}

#[test]
fn test_strategy_selection() {
    init_logger();
    let exact = GraphModel::new(softmax_graph(&GRAYSCALE, DType::F32, 1), config()).unwrap();
    assert_eq!(exact.strategy(), LogitsStrategy::PreActivation);

    let fused = GraphModel::new(fused_graph(&GRAYSCALE, DType::F32, 1), config()).unwrap();
    assert_eq!(fused.strategy(), LogitsStrategy::LogClip);

    let native = logits_graph_model(&GRAYSCALE, DType::F32, 1);
    assert_eq!(native.strategy(), LogitsStrategy::Native);

    let graph = logits_graph(&GRAYSCALE, DType::F32, 1);
    let guessed =
        GraphModel::with_convention(graph, config(), OutputConvention::Probabilities).unwrap();
    assert_eq!(guessed.strategy(), LogitsStrategy::LogClip);
}

#[test]
fn test_pre_activation_logits_are_exact() {
    let exact = GraphModel::new(softmax_graph(&GRAYSCALE, DType::F64, 2), config()).unwrap();
    let native = logits_graph_model(&GRAYSCALE, DType::F64, 2);
    let batch = images(4, &GRAYSCALE, DType::F64, 3);
    assert_eq!(
        exact.batch_predictions(&batch).unwrap().get_f64_data().unwrap(),
        native.batch_predictions(&batch).unwrap().get_f64_data().unwrap()
    );
}

#[test]
fn test_log_clip_logits_match_exact_up_to_row_shift() {
    let exact = GraphModel::new(explicit_graph(false), config()).unwrap();
    let clipped = GraphModel::new(explicit_graph(true), config()).unwrap();
    assert_eq!(clipped.strategy(), LogitsStrategy::LogClip);

    let batch = images(16, &[FEATURES], DType::F64, 4);
    let exact_logits = exact.batch_predictions(&batch).unwrap();
    let probabilities = softmax_op(&exact_logits).unwrap().get_f64_data().unwrap();
    assert!(probabilities.iter().all(|&p| (0.01..=0.99).contains(&p)));

    let expected = centered_rows(&exact_logits.get_f64_data().unwrap());
    let actual = centered_rows(&clipped.batch_predictions(&batch).unwrap().get_f64_data().unwrap());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!((a - e).abs() < 1e-5, "log-clip logit {} vs exact {}", a, e);
    }
}

#[test]
fn test_log_clip_gradients_match_exact() {
    let exact = GraphModel::new(explicit_graph(false), config()).unwrap();
    let clipped = GraphModel::new(explicit_graph(true), config()).unwrap();
    let batch = images(5, &[FEATURES], DType::F64, 5);
    let labels = [0, 1, 2, 3, 0];

    let a = clipped.batch_gradients(&batch, &labels).unwrap().get_f64_data().unwrap();
    let e = exact.batch_gradients(&batch, &labels).unwrap().get_f64_data().unwrap();
    for (x, y) in a.iter().zip(e.iter()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-8);
    }

    let first = select_op(&batch, 0).unwrap();
    assert_abs_diff_eq!(
        clipped.loss(&first, 0).unwrap(),
        exact.loss(&first, 0).unwrap(),
        epsilon = 1e-10
    );
}
