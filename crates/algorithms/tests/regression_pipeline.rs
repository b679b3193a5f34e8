//! End-to-end regression on a synthetic housing-style CSV.
//!
//! The target depends linearly on median income, nonlinearly on latitude
//! and not at all on `Noise`, so the linear models, LASSO, k-NN and the
//! forest each have something distinct to show.

use geolearn_algorithms::metrics::rmse;
use geolearn_algorithms::model_selection::{sweep, train_test_split, train_validation_test_split, SplitFractions};
use geolearn_algorithms::pipeline::RegressionExperiment;
use geolearn_algorithms::regression::{
    KNeighborsRegressor, Lasso, LinearRegression, RandomForestRegressor, RegressorKind, Weights,
};
use geolearn_algorithms::statistics::target_correlations;
use geolearn_algorithms::transform::Scaler;
use geolearn_core::io::read_csv_table;
use geolearn_core::{Estimator, Predictor, TabularDataset};
use std::fmt::Write as _;

fn housing_csv(n: usize) -> String {
    let mut csv = String::from("MedInc,HouseAge,Latitude,Noise,MedHouseVal\n");
    for i in 0..n {
        let income = 1.0 + (i * 37 % 100) as f64 / 10.0;
        let age = (i * 11 % 52) as f64;
        let lat = 32.5 + (i * 53 % 90) as f64 / 10.0;
        let noise = (i * 71 % 13) as f64;
        let value = 0.4 * income + if lat > 37.0 { 1.5 } else { 0.0 } + 0.01 * age;
        writeln!(csv, "{},{},{},{},{}", income, age, lat, noise, value).unwrap();
    }
    csv
}

fn load(n: usize) -> TabularDataset {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("housing.csv");
    std::fs::write(&path, housing_csv(n)).unwrap();
    read_csv_table(&path, "MedHouseVal").unwrap()
}

#[test]
fn dataset_description_and_correlations() {
    let dataset = load(300);
    assert!(dataset.description.starts_with("300 samples, 4 features, target 'MedHouseVal'"));
    let corr = target_correlations(&dataset.table).unwrap();
    let income = dataset.table.feature_index("MedInc").unwrap();
    let noise = dataset.table.feature_index("Noise").unwrap();
    assert!(corr[income] > 0.5);
    assert!(corr[noise].abs() < corr[income]);
}

#[test]
fn all_models_beat_the_mean() {
    let dataset = load(400);
    let (train, test) = train_test_split(&dataset.table, 0.25, 7).unwrap();
    let mean = train.target().mean().unwrap();
    let baseline = rmse(test.target(), ndarray::Array1::from_elem(test.n_samples(), mean).view()).unwrap();

    let models: Vec<RegressorKind> = vec![
        LinearRegression::default().into(),
        Lasso::with_alpha(0.01).into(),
        KNeighborsRegressor::new(5, Weights::Distance).into(),
        RandomForestRegressor {
            n_estimators: 20,
            ..Default::default()
        }
        .into(),
    ];
    for model in models {
        let label = model.label();
        let report = RegressionExperiment::new(model)
            .with_scaler(Scaler::Standard)
            .run(&train, &test)
            .unwrap();
        assert!(
            report.eval_rmse < baseline,
            "{}: rmse {} vs baseline {}",
            label,
            report.eval_rmse,
            baseline
        );
        assert_eq!(report.predictions.len(), test.n_samples());
    }
}

#[test]
fn forest_captures_threshold_better_than_ols() {
    let dataset = load(500);
    let (train, test) = train_test_split(&dataset.table, 0.2, 1).unwrap();
    let ols = RegressionExperiment::new(LinearRegression::default()).run(&train, &test).unwrap();
    let forest = RegressionExperiment::new(RandomForestRegressor {
        n_estimators: 30,
        ..Default::default()
    })
    .run(&train, &test)
    .unwrap();
    assert!(forest.eval_rmse < ols.eval_rmse);
}

#[test]
fn lasso_sweep_picks_small_alpha() {
    let dataset = load(400);
    let split = train_validation_test_split(&dataset.table, SplitFractions::default(), 3).unwrap();
    let candidates: Vec<RegressorKind> = [10.0, 1.0, 0.1, 0.001]
        .iter()
        .map(|&a| Lasso::with_alpha(a).into())
        .collect();
    let scores = sweep(&candidates, &split.train, &split.validation).unwrap();
    assert_eq!(scores.len(), 4);
    assert!(scores[0].validation_rmse <= scores[3].validation_rmse);
    assert_ne!(scores[0].index, 0, "alpha = 10 removes every feature");

    let best = candidates[scores[0].index].fit(split.train.features(), split.train.target()).unwrap();
    let test_rmse = rmse(split.test.target(), best.predict(split.test.features()).unwrap().view()).unwrap();
    assert!(test_rmse.is_finite());
}
