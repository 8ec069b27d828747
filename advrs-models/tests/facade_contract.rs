use std::sync::Arc;

use advrs_core::autograd::grad;
use advrs_core::graph::GraphBuilder;
use advrs_core::nn::{Linear, Module};
use advrs_core::ops::activation::softmax_op;
use advrs_core::ops::arithmetic::sub_op;
use advrs_core::ops::loss::sparse_cross_entropy_op;
use advrs_core::ops::reduction::sum_op;
use advrs_core::{AdvrsError, DType, Tensor};
use advrs_models::{
    DifferentiableModel, GraphModel, LayerModel, ModelConfig, ModelError, OutputConvention,
    Preprocessing, TapeModel,
};
use approx::assert_abs_diff_eq;
use semver::Version;

mod common;
use common::*;

fn all_models(
    input_shape: &[usize],
    dtype: DType,
) -> Vec<(&'static str, Box<dyn DifferentiableModel>)> {
    let graph: Box<dyn DifferentiableModel> = Box::new(graph_model(input_shape, dtype, 11));
    let layers: Box<dyn DifferentiableModel> = Box::new(layer_model(input_shape, dtype, 11));
    let tape: Box<dyn DifferentiableModel> = Box::new(tape_model(input_shape, dtype, 11));
    vec![("graph", graph), ("layers", layers), ("tape", tape)]
}

fn one_hot(labels: &[usize], classes: usize) -> Tensor {
    let mut data = vec![0.0; labels.len() * classes];
    for (i, &l) in labels.iter().enumerate() {
        data[i * classes + l] = 1.0;
    }
    Tensor::new_f64(data, vec![labels.len(), classes]).unwrap()
}

#[test]
fn test_batch_predictions_shape() {
    init_logger();
    for (name, model) in all_models(&GRAYSCALE, DType::F32) {
        for n in [1, 4, 32] {
            let logits = model.batch_predictions(&images(n, &GRAYSCALE, DType::F32, 1)).unwrap();
            assert_eq!(logits.shape(), vec![n, CLASSES], "{} with N = {}", name, n);
            assert_eq!(model.num_classes(), CLASSES);
        }
    }
}

#[test]
fn test_gradient_keeps_input_shape_and_dtype() {
    for input_shape in [&GRAYSCALE[..], &MULTI_CHANNEL[..]] {
        for dtype in [DType::F32, DType::F64] {
            for (name, model) in all_models(input_shape, dtype) {
                let image = images(1, input_shape, dtype, 2).reshape(input_shape.to_vec()).unwrap();
                let (predictions, gradient) = model.predictions_and_gradient(&image, 1).unwrap();
                assert_eq!(predictions.shape(), vec![CLASSES], "{}", name);
                assert_eq!(gradient.shape(), image.shape(), "{}", name);
                assert_eq!(gradient.dtype(), dtype, "{}", name);
                assert!(gradient.to_f64_vec().iter().all(|v| v.is_finite()));
            }
        }
    }
}

#[test]
fn test_batch_backward_rejects_wrong_rank() {
    let batch = images(1, &GRAYSCALE, DType::F32, 3);
    let rank1 = Tensor::new(vec![1.0; CLASSES], vec![CLASSES]).unwrap();
    let rank3 = Tensor::new(vec![1.0; CLASSES], vec![1, 1, CLASSES]).unwrap();
    for (name, model) in all_models(&GRAYSCALE, DType::F32) {
        for upstream in [&rank1, &rank3] {
            let result = model.batch_backward(upstream, &batch);
            assert!(
                matches!(result, Err(ModelError::InvalidShape { .. })),
                "{}: {:?}",
                name,
                result
            );
        }
        let wrong_classes = Tensor::new(vec![1.0; CLASSES + 1], vec![1, CLASSES + 1]).unwrap();
        assert!(matches!(
            model.batch_backward(&wrong_classes, &batch),
            Err(ModelError::InvalidShape { .. })
        ));
    }
}

#[test]
fn test_layer_model_limits_gradient_batches() {
    let model = layer_model(&GRAYSCALE, DType::F32, 4);
    let pair = images(2, &GRAYSCALE, DType::F32, 4);
    assert!(matches!(
        model.batch_gradients(&pair, &[0, 1]),
        Err(ModelError::NotSupported(_))
    ));
    let upstream = Tensor::new(vec![1.0; 2 * CLASSES], vec![2, CLASSES]).unwrap();
    assert!(matches!(
        model.batch_backward(&upstream, &pair),
        Err(ModelError::NotSupported(_))
    ));
    assert_eq!(model.batch_predictions(&pair).unwrap().shape(), vec![2, CLASSES]);

    let single = images(1, &GRAYSCALE, DType::F32, 5);
    let image = single.reshape(GRAYSCALE.to_vec()).unwrap();
    let batched = model.batch_gradients(&single, &[2]).unwrap();
    let (_, direct) = model.predictions_and_gradient(&image, 2).unwrap();
    assert_eq!(batched.get_f32_data().unwrap(), direct.get_f32_data().unwrap());

    let upstream = Tensor::new(vec![0.5, -1.0, 2.0, 0.0], vec![CLASSES]).unwrap();
    let single_backward = model.backward(&upstream, &image).unwrap();
    let batched_backward = model
        .batch_backward(&upstream.reshape(vec![1, CLASSES]).unwrap(), &single)
        .unwrap();
    assert_eq!(batched_backward.shape(), single.shape());
    assert_eq!(
        batched_backward.get_f32_data().unwrap(),
        single_backward.get_f32_data().unwrap()
    );
}

#[test]
fn test_label_validation() {
    let batch = images(3, &GRAYSCALE, DType::F32, 6);
    for (name, model) in all_models(&GRAYSCALE, DType::F32) {
        let too_few = model.batch_gradients(&batch, &[0, 1]);
        assert!(matches!(too_few, Err(ModelError::InvalidShape { .. })), "{}", name);
        let out_of_range = model.batch_gradients(&batch, &[0, 1, CLASSES]);
        assert!(matches!(out_of_range, Err(ModelError::InvalidShape { .. })), "{}", name);
        let image = batch.reshape(vec![3 * 5, 5]).unwrap();
        assert!(model.loss(&image, 0).is_err(), "{}", name);
    }
}

#[test]
fn test_gradient_matches_finite_differences() {
    let epsilon = 1e-6;
    for (name, model) in all_models(&GRAYSCALE, DType::F64) {
        let image = images(1, &GRAYSCALE, DType::F64, 7).reshape(GRAYSCALE.to_vec()).unwrap();
        let label = 3;
        let analytical = model.gradient(&image, label).unwrap().get_f64_data().unwrap();
        let base = image.get_f64_data().unwrap();
        for i in 0..base.len() {
            let mut plus = base.clone();
            plus[i] += epsilon;
            let mut minus = base.clone();
            minus[i] -= epsilon;
            let plus = Tensor::new_f64(plus, GRAYSCALE.to_vec()).unwrap();
            let minus = Tensor::new_f64(minus, GRAYSCALE.to_vec()).unwrap();
            let l_plus = model.loss(&plus, label).unwrap();
            let l_minus = model.loss(&minus, label).unwrap();
            let numerical = (l_plus - l_minus) / (2.0 * epsilon);
            assert_abs_diff_eq!(analytical[i], numerical, epsilon = 1e-5);
        }
        assert!(model.loss(&image, label).unwrap() > 0.0, "{}", name);
    }
}

#[test]
fn test_backward_of_cross_entropy_seed_matches_gradients() {
    let labels = [0, 3, 1, 2];
    let graph: Box<dyn DifferentiableModel> = Box::new(graph_model(&MULTI_CHANNEL, DType::F64, 8));
    let tape: Box<dyn DifferentiableModel> = Box::new(tape_model(&MULTI_CHANNEL, DType::F64, 8));
    for (name, model) in [("graph", graph), ("tape", tape)] {
        let batch = images(4, &MULTI_CHANNEL, DType::F64, 9);
        let logits = model.batch_predictions(&batch).unwrap();
        let upstream = sub_op(&softmax_op(&logits).unwrap(), &one_hot(&labels, CLASSES)).unwrap();
        let via_backward = model.batch_backward(&upstream, &batch).unwrap().get_f64_data().unwrap();
        let via_gradients = model.batch_gradients(&batch, &labels).unwrap().get_f64_data().unwrap();
        for (a, b) in via_backward.iter().zip(via_gradients.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
        assert_eq!(via_backward.len(), batch.numel(), "{}", name);
    }
}

#[test]
fn test_single_example_wrappers() {
    let model = tape_model(&GRAYSCALE, DType::F32, 10);
    let batch = images(1, &GRAYSCALE, DType::F32, 10);
    let image = batch.reshape(GRAYSCALE.to_vec()).unwrap();

    let row = model.batch_predictions(&batch).unwrap().get_f32_data().unwrap();
    assert_eq!(model.predictions(&image).unwrap().get_f32_data().unwrap(), row);
    let (predictions, _) = model.predictions_and_gradient(&image, 0).unwrap();
    assert_eq!(predictions.get_f32_data().unwrap(), row);

    let upstream = Tensor::new(vec![1.0, 0.0, -1.0, 0.5], vec![CLASSES]).unwrap();
    assert_eq!(model.backward(&upstream, &image).unwrap().shape(), image.shape());
    let batched_upstream = upstream.reshape(vec![1, CLASSES]).unwrap();
    assert!(matches!(
        model.backward(&batched_upstream, &image),
        Err(ModelError::InvalidShape { .. })
    ));
}

#[test]
fn test_preprocessing_scales_gradients() {
    let (s, d) = (0.5, 2.0);
    let plain = tape_model(&GRAYSCALE, DType::F64, 12);
    let scaled = TapeModel::new(
        network(&GRAYSCALE, DType::F64, 12),
        CLASSES,
        config().with_preprocessing(Preprocessing::scalar(s, d).unwrap()),
    )
    .unwrap();

    let batch = images(2, &GRAYSCALE, DType::F64, 13);
    let normalized: Vec<f64> = batch.get_f64_data().unwrap().iter().map(|x| (x - s) / d).collect();
    let normalized = Tensor::new_f64(normalized, batch.shape()).unwrap();

    let expected: Vec<f64> = plain
        .batch_gradients(&normalized, &[1, 2])
        .unwrap()
        .get_f64_data()
        .unwrap()
        .iter()
        .map(|g| g / d)
        .collect();
    let actual = scaled.batch_gradients(&batch, &[1, 2]).unwrap().get_f64_data().unwrap();
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, e, epsilon = 1e-12);
    }
}

/// The bare logits computation each of [`all_models`] wraps.
fn reference_logits(name: &str, dtype: DType) -> Box<dyn Fn(&Tensor) -> Tensor> {
    if name == "graph" {
        let graph = logits_graph(&GRAYSCALE, dtype, 11);
        let plan = graph.compile(&[graph.output()]).unwrap();
        Box::new(move |x: &Tensor| plan.run(x).unwrap().remove(0))
    } else {
        let reference = network(&GRAYSCALE, dtype, 11);
        Box::new(move |x: &Tensor| reference.forward(x).unwrap())
    }
}

#[test]
fn test_identity_preprocessing_is_bit_identical() {
    init_logger();
    let label = 2;
    let upstream = Tensor::new(vec![1.0, -0.5, 0.25, 2.0], vec![1, CLASSES]).unwrap();
    for (name, model) in all_models(&GRAYSCALE, DType::F32) {
        let reference = reference_logits(name, DType::F32);

        let batch = images(3, &GRAYSCALE, DType::F32, 15);
        assert_eq!(
            model.batch_predictions(&batch).unwrap().get_f32_data().unwrap(),
            reference(&batch).get_f32_data().unwrap(),
            "{}",
            name
        );

        let single = images(1, &GRAYSCALE, DType::F32, 16);
        let image = single.reshape(GRAYSCALE.to_vec()).unwrap();

        let leaf = single.detach();
        leaf.set_requires_grad(true).unwrap();
        let logits = reference(&leaf);
        let per_example = sparse_cross_entropy_op(&logits, &[label]).unwrap();
        let loss = sum_op(&per_example, None, false).unwrap();
        let direct_grad = grad(&loss, None, &[leaf]).unwrap().remove(0).get_f32_data().unwrap();

        let (predictions, gradient) = model.predictions_and_gradient(&image, label).unwrap();
        assert_eq!(
            predictions.get_f32_data().unwrap(),
            logits.detach().get_f32_data().unwrap(),
            "{}",
            name
        );
        assert_eq!(gradient.get_f32_data().unwrap(), direct_grad, "{}", name);
        assert_eq!(
            model.batch_gradients(&single, &[label]).unwrap().get_f32_data().unwrap(),
            direct_grad,
            "{}",
            name
        );

        let leaf = single.detach();
        leaf.set_requires_grad(true).unwrap();
        let direct_vjp = grad(&reference(&leaf), Some(&upstream), &[leaf]).unwrap().remove(0);
        assert_eq!(
            model.batch_backward(&upstream, &single).unwrap().get_f32_data().unwrap(),
            direct_vjp.get_f32_data().unwrap(),
            "{}",
            name
        );
    }
}

/// Declares an element-wise output shape but emits one extra class column.
#[derive(Debug)]
struct Widen {
    linear: Linear,
}

impl Module for Widen {
    fn forward(&self, input: &Tensor) -> Result<Tensor, AdvrsError> {
        self.linear.forward(input)
    }
}

#[test]
fn test_misdeclared_output_width_is_invalid_shape() {
    init_logger();
    let widen = Widen {
        linear: Linear::new(CLASSES, CLASSES + 1, true, DType::F32, &mut rng(17)).unwrap(),
    };
    let widened = network(&GRAYSCALE, DType::F32, 17).with("widen", widen);
    let model = LayerModel::new(widened, &GRAYSCALE, config()).unwrap();
    assert_eq!(model.num_classes(), CLASSES);

    let single = images(1, &GRAYSCALE, DType::F32, 18);
    let image = single.reshape(GRAYSCALE.to_vec()).unwrap();
    let upstream = Tensor::new(vec![1.0; CLASSES], vec![1, CLASSES]).unwrap();
    let invalid = |result: Result<Tensor, ModelError>| {
        matches!(result, Err(ModelError::InvalidShape { .. }))
    };
    assert!(invalid(model.batch_predictions(&single)));
    assert!(invalid(model.batch_gradients(&single, &[0])));
    assert!(invalid(model.batch_backward(&upstream, &single)));
    assert!(invalid(model.predictions_and_gradient(&image, 0).map(|(p, _)| p)));
    assert!(matches!(model.loss(&image, 0), Err(ModelError::InvalidShape { .. })));
}

#[test]
fn test_configuration_errors() {
    let mut b = GraphBuilder::new(&GRAYSCALE);
    let x = b.input();
    let flat = b.flatten(x).unwrap();
    let out = b.lambda(flat, "opaque", None, |t: &Tensor| Ok(t.clone())).unwrap();
    let unknown_width = Arc::new(b.build(out).unwrap());
    assert!(matches!(
        GraphModel::new(unknown_width, config()),
        Err(ModelError::Configuration(_))
    ));

    assert!(matches!(
        TapeModel::new(network(&GRAYSCALE, DType::F32, 1), 0, config()),
        Err(ModelError::Configuration(_))
    ));

    for version in [Version::new(0, 0, 9), Version::new(9, 0, 0)] {
        let mut b = GraphBuilder::new(&GRAYSCALE).with_format_version(version);
        let x = b.input();
        let flat = b.flatten(x).unwrap();
        let mut r = rng(1);
        let logits = b.dense_init(flat, CLASSES, DType::F32, &mut r).unwrap();
        let graph = Arc::new(b.build(logits).unwrap());
        assert!(matches!(
            GraphModel::with_convention(graph, config(), OutputConvention::Logits),
            Err(ModelError::Configuration(_))
        ));
    }

    assert!(matches!(
        LayerModel::new(network(&GRAYSCALE, DType::F32, 1), &[7], config()),
        Err(ModelError::Configuration(_))
    ));
}

#[test]
fn test_channel_axis_defaults() {
    assert_eq!(
        graph_model(&GRAYSCALE, DType::F32, 1).channel_axis(),
        GraphModel::DEFAULT_CHANNEL_AXIS
    );
    assert_eq!(GraphModel::DEFAULT_CHANNEL_AXIS, 3);
    assert_eq!(layer_model(&GRAYSCALE, DType::F32, 1).channel_axis(), 1);
    assert_eq!(tape_model(&GRAYSCALE, DType::F32, 1).channel_axis(), 1);

    let custom = TapeModel::new(
        network(&GRAYSCALE, DType::F32, 1),
        CLASSES,
        ModelConfig::new(advrs_models::Bounds::new(-1.0, 1.0).unwrap()).with_channel_axis(0),
    )
    .unwrap();
    assert_eq!(custom.channel_axis(), 0);
    assert_eq!(custom.bounds().min(), -1.0);
}

#[test]
fn test_wrong_input_shape_is_invalid_shape() {
    let wrong = images(2, &MULTI_CHANNEL, DType::F32, 1);
    let graph: Box<dyn DifferentiableModel> = Box::new(graph_model(&GRAYSCALE, DType::F32, 1));
    let layers: Box<dyn DifferentiableModel> = Box::new(layer_model(&GRAYSCALE, DType::F32, 1));
    for model in [graph, layers] {
        assert!(matches!(
            model.batch_predictions(&wrong),
            Err(ModelError::InvalidShape { .. })
        ));
    }
}
