// Shared by several test crates; not every helper is used by each one.
#![allow(dead_code)]

use std::sync::Arc;

use advrs_core::graph::{Graph, GraphBuilder};
use advrs_core::nn::{Flatten, Linear, Relu, Sequential};
use advrs_core::tensor::rand_uniform;
use advrs_core::{DType, Tensor};
use advrs_models::{Bounds, GraphModel, LayerModel, ModelConfig, OutputConvention, TapeModel};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub const CLASSES: usize = 4;
pub const GRAYSCALE: [usize; 2] = [5, 5];
pub const MULTI_CHANNEL: [usize; 3] = [3, 4, 4];

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn config() -> ModelConfig {
    ModelConfig::new(Bounds::new(0.0, 1.0).expect("valid bounds"))
}

/// Images in `[0, 1)` with shape `[n, ..per_example]`.
pub fn images(n: usize, per_example: &[usize], dtype: DType, seed: u64) -> Tensor {
    let mut shape = vec![n];
    shape.extend_from_slice(per_example);
    rand_uniform(&shape, 0.0, 1.0, dtype, &mut rng(seed)).expect("random images")
}

/// flatten -> dense(8) -> relu -> dense(CLASSES) -> softmax
pub fn softmax_graph(input_shape: &[usize], dtype: DType, seed: u64) -> Arc<Graph> {
    let mut r = rng(seed);
    let mut b = GraphBuilder::new(input_shape);
    let x = b.input();
    let flat = b.flatten(x).expect("flatten");
    let hidden = b.dense_init(flat, 8, dtype, &mut r).expect("dense");
    let act = b.relu(hidden).expect("relu");
    let logits = b.dense_init(act, CLASSES, dtype, &mut r).expect("dense");
    let probs = b.softmax(logits).expect("softmax");
    Arc::new(b.build(probs).expect("graph"))
}

/// Same weights as [`softmax_graph`] but fused, so no pre-activation node exists.
pub fn fused_graph(input_shape: &[usize], dtype: DType, seed: u64) -> Arc<Graph> {
    let mut r = rng(seed);
    let mut b = GraphBuilder::new(input_shape);
    let x = b.input();
    let flat = b.flatten(x).expect("flatten");
    let hidden = b.dense_init(flat, 8, dtype, &mut r).expect("dense");
    let act = b.relu(hidden).expect("relu");
    let probs = b.dense_softmax_init(act, CLASSES, dtype, &mut r).expect("dense_softmax");
    Arc::new(b.build(probs).expect("graph"))
}

/// The logits-only prefix of [`softmax_graph`].
pub fn logits_graph(input_shape: &[usize], dtype: DType, seed: u64) -> Arc<Graph> {
    let mut r = rng(seed);
    let mut b = GraphBuilder::new(input_shape);
    let x = b.input();
    let flat = b.flatten(x).expect("flatten");
    let hidden = b.dense_init(flat, 8, dtype, &mut r).expect("dense");
    let act = b.relu(hidden).expect("relu");
    let logits = b.dense_init(act, CLASSES, dtype, &mut r).expect("dense");
    Arc::new(b.build(logits).expect("graph"))
}

pub fn graph_model(input_shape: &[usize], dtype: DType, seed: u64) -> GraphModel {
    GraphModel::new(softmax_graph(input_shape, dtype, seed), config()).expect("graph model")
}

pub fn logits_graph_model(input_shape: &[usize], dtype: DType, seed: u64) -> GraphModel {
    let graph = logits_graph(input_shape, dtype, seed);
    GraphModel::with_convention(graph, config(), OutputConvention::Logits).expect("graph model")
}

pub fn network(input_shape: &[usize], dtype: DType, seed: u64) -> Sequential {
    let mut r = rng(seed);
    let features: usize = input_shape.iter().product();
    Sequential::new()
        .with("flatten", Flatten::new())
        .with("fc1", Linear::new(features, 8, true, dtype, &mut r).expect("linear"))
        .with("relu", Relu::new())
        .with("fc2", Linear::new(8, CLASSES, true, dtype, &mut r).expect("linear"))
}

pub fn layer_model(input_shape: &[usize], dtype: DType, seed: u64) -> LayerModel {
    LayerModel::new(network(input_shape, dtype, seed), input_shape, config()).expect("layer model")
}

pub fn tape_model(input_shape: &[usize], dtype: DType, seed: u64) -> TapeModel<Sequential> {
    TapeModel::new(network(input_shape, dtype, seed), CLASSES, config()).expect("tape model")
}
