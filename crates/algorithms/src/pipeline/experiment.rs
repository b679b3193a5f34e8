//! Fit-and-evaluate runs for one regressor on a train/evaluation pair

use crate::metrics::{mae, r2_score, rmse};
use crate::regression::RegressorKind;
use crate::transform::Scaler;
use geolearn_core::{Estimator, FeatureTable, Predictor, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One regression run: feature subset, optional scaling and an estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionExperiment {
    pub estimator: RegressorKind,
    /// Scaling fitted on the training rows only
    pub scaler: Option<Scaler>,
    /// Feature columns by name; `None` keeps every column
    pub features: Option<Vec<String>>,
}

impl RegressionExperiment {
    pub fn new(estimator: impl Into<RegressorKind>) -> Self {
        Self {
            estimator: estimator.into(),
            scaler: None,
            features: None,
        }
    }

    pub fn with_scaler(mut self, scaler: Scaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn with_features<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.features = Some(names.into_iter().map(Into::into).collect());
        self
    }

    fn prepare(&self, table: &FeatureTable) -> Result<FeatureTable> {
        match &self.features {
            Some(names) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                table.select_by_name(&names)
            }
            None => Ok(table.clone()),
        }
    }

    /// Fit on `train`, then score on both `train` and `evaluation`.
    pub fn run(&self, train: &FeatureTable, evaluation: &FeatureTable) -> Result<ExperimentReport> {
        let mut train = self.prepare(train)?;
        let mut evaluation = self.prepare(evaluation)?;

        if let Some(kind) = self.scaler {
            let state = kind.fit(train.features())?;
            train = train.with_features(state.transform(train.features())?)?;
            evaluation = evaluation.with_features(state.transform(evaluation.features())?)?;
        }

        let model = self.estimator.fit(train.features(), train.target())?;
        let train_pred = model.predict(train.features())?;
        let eval_pred = model.predict(evaluation.features())?;

        let report = ExperimentReport {
            model: self.estimator.label(),
            features: train.feature_names().to_vec(),
            n_train: train.n_samples(),
            n_eval: evaluation.n_samples(),
            train_rmse: rmse(train.target(), train_pred.view())?,
            eval_rmse: rmse(evaluation.target(), eval_pred.view())?,
            train_r2: r2_score(train.target(), train_pred.view())?,
            eval_r2: r2_score(evaluation.target(), eval_pred.view())?,
            eval_mae: mae(evaluation.target(), eval_pred.view())?,
            predictions: eval_pred.to_vec(),
        };
        info!(
            model = %report.model,
            train_rmse = report.train_rmse,
            eval_rmse = report.eval_rmse,
            "experiment finished"
        );
        Ok(report)
    }
}

/// Scores of one [`RegressionExperiment`] run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub model: String,
    pub features: Vec<String>,
    pub n_train: usize,
    pub n_eval: usize,
    pub train_rmse: f64,
    pub eval_rmse: f64,
    pub train_r2: f64,
    pub eval_r2: f64,
    pub eval_mae: f64,
    /// Predictions for the evaluation rows, in row order
    pub predictions: Vec<f64>,
}
