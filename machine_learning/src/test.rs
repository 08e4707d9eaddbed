#![cfg(test)]

use std::num::NonZeroUsize;

use ndarray::ArrayView2;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    MlErr,
    arch::{
        Model, ModelSpec, Sequential, TrainedModel,
        layers::Layer,
        loss::{LossFn, Mse},
    },
    dataset::Dataset,
    optimization::Adam,
    training::ModelTrainer,
};

fn batch(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn test_ml_linear_convergence() {
    let line = [
        0.00, 1.0, //
        0.25, 1.5, //
        0.50, 2.0, //
        0.75, 2.5, //
        1.00, 3.0, //
    ];

    let mut dataset = Dataset::new(line.into(), 1, 1).unwrap();
    let model = Sequential::new([Layer::dense((1, 1), None)]);
    let mut params = vec![0.; model.size()];

    let mut trainer = ModelTrainer::new(
        model,
        Adam::with_defaults(params.len(), 0.05),
        Mse,
        2000,
        batch(5),
        StdRng::seed_from_u64(42),
    );
    let losses = trainer.train(&mut params, &mut dataset).unwrap();
    assert_eq!(losses.len(), 2000);
    assert!(losses[1999] < 1e-3, "final loss {}", losses[1999]);

    let model = trainer.into_model();
    let x = ArrayView2::from_shape((1, 1), &[0.6]).unwrap();
    let y_pred = model.predict(&params, x).unwrap();
    assert!((y_pred[[0, 0]] - 2.2).abs() < 5e-2);
}

#[test]
fn test_ml_adam_regressor_learns_the_mean() {
    let rows: Vec<f32> = (0..64)
        .flat_map(|i| {
            let a = (i % 8) as f32 / 8.;
            let b = (i / 8) as f32 / 8.;
            let c = ((i * 5) % 8) as f32 / 8.;
            [a, b, c, (a + b + c) / 3.]
        })
        .collect();
    let mut dataset = Dataset::new(rows, 3, 1).unwrap();

    let spec = ModelSpec::sequence_regressor(3, 8, 1, 0.).unwrap();
    let model = spec.build(42);
    let mut rng = StdRng::seed_from_u64(42);
    let mut params = model.init_params(&mut rng).unwrap();

    let before = Mse.loss(
        model.predict(&params, dataset.x()).unwrap().view(),
        dataset.y(),
    );

    let optimizer = Adam::with_defaults(params.len(), 0.01);
    let mut trainer = ModelTrainer::new(model, optimizer, Mse, 200, batch(16), rng);
    let losses = trainer.train(&mut params, &mut dataset).unwrap();

    let trained = TrainedModel::new(spec, params).unwrap();
    let after = Mse.loss(trained.predict(dataset.x()).unwrap().view(), dataset.y());

    assert!(losses.iter().all(|loss| loss.is_finite()));
    assert!(after < before, "loss went from {before} to {after}");
    assert!(after < 1e-2, "final loss {after}");
}

#[test]
fn test_ml_same_seed_same_training() {
    let rows: Vec<f32> = (0..20).flat_map(|i| [i as f32 / 20., 1. - i as f32 / 20.]).collect();
    let spec = ModelSpec::sequence_regressor(1, 4, 2, 0.2).unwrap();

    let run = || {
        let mut dataset = Dataset::new(rows.clone(), 1, 1).unwrap();
        let model = spec.build(7);
        let mut rng = StdRng::seed_from_u64(7);
        let mut params = model.init_params(&mut rng).unwrap();
        let optimizer = Adam::with_defaults(params.len(), 0.01);
        let mut trainer = ModelTrainer::new(model, optimizer, Mse, 5, batch(4), rng);
        let losses = trainer.train(&mut params, &mut dataset).unwrap();
        (params, losses)
    };

    assert_eq!(run(), run());
}

#[test]
fn test_ml_non_finite_input_fails_training() {
    let mut dataset = Dataset::new(vec![f32::NAN, 1., 0.5, 2.], 1, 1).unwrap();
    let model = Sequential::new([Layer::dense((1, 1), None)]);
    let mut params = vec![0.; model.size()];

    let mut trainer = ModelTrainer::new(
        model,
        Adam::with_defaults(params.len(), 0.1),
        Mse,
        3,
        batch(2),
        StdRng::seed_from_u64(1),
    );

    let err = trainer.train(&mut params, &mut dataset).unwrap_err();
    assert!(matches!(err, MlErr::NonFiniteLoss { epoch: 0, .. }));
}

#[test]
fn test_ml_empty_dataset() {
    let mut dataset = Dataset::new(vec![], 1, 1).unwrap();
    let model = Sequential::new([Layer::dense((1, 1), None)]);
    let mut params = vec![0.; model.size()];

    let mut trainer = ModelTrainer::new(
        model,
        Adam::with_defaults(params.len(), 0.1),
        Mse,
        1,
        batch(2),
        StdRng::seed_from_u64(1),
    );

    assert_eq!(
        trainer.train(&mut params, &mut dataset),
        Err(MlErr::EmptyDataset)
    );
}

#[test]
fn test_trained_model_roundtrip_and_inference() {
    let spec = ModelSpec::sequence_regressor(4, 3, 2, 0.5).unwrap();
    let model = spec.build(0);
    let params = model.init_params(&mut StdRng::seed_from_u64(3)).unwrap();
    let trained = TrainedModel::new(spec.clone(), params.clone()).unwrap();

    let json = serde_json::to_string(&trained).unwrap();
    let decoded: TrainedModel = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, trained);

    // dropout is the identity at inference
    let sequence = [0.1, 0.2, 0.3, 0.4];
    let first = decoded.predict_one(&sequence).unwrap();
    let second = decoded.predict_one(&sequence).unwrap();
    assert_eq!(first, second);

    let x = ArrayView2::from_shape((1, 4), &sequence).unwrap();
    assert_eq!(model.predict(&params, x).unwrap()[[0, 0]], first);

    assert!(decoded.predict_one(&sequence[..3]).is_err());
    assert!(TrainedModel::new(spec, params[1..].to_vec()).is_err());
}

#[test]
fn test_decoding_checks_the_parameter_count() {
    let spec = ModelSpec::sequence_regressor(3, 2, 1, 0.).unwrap();
    let size = spec.build(0).size();
    let trained = TrainedModel::new(spec, vec![0.5; size]).unwrap();

    let mut json = serde_json::to_value(&trained).unwrap();
    json["params"].as_array_mut().unwrap().push(serde_json::json!(0.5));

    let err = serde_json::from_value::<TrainedModel>(json).unwrap_err();
    assert!(err.to_string().contains("trained model params"), "{err}");
}

#[test]
fn test_invalid_regressor_hyperparameters() {
    assert!(ModelSpec::sequence_regressor(0, 4, 1, 0.).is_err());
    assert!(ModelSpec::sequence_regressor(4, 0, 1, 0.).is_err());
    assert!(ModelSpec::sequence_regressor(4, 4, 0, 0.).is_err());
    assert!(ModelSpec::sequence_regressor(4, 4, 1, 1.5).is_err());
    assert_eq!(ModelSpec::sequence_regressor(60, 8, 2, 0.2).unwrap().input_size(), 60);
}
