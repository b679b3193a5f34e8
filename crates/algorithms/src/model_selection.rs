//! Data splitting and hyperparameter sweeps

use crate::metrics::rmse;
use crate::regression::RegressorKind;
use geolearn_core::{Error, Estimator, FeatureTable, Predictor, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Shares of the rows held out for validation and test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitFractions {
    pub validation: f64,
    pub test: f64,
}

impl Default for SplitFractions {
    fn default() -> Self {
        Self {
            validation: 0.2,
            test: 0.2,
        }
    }
}

/// Disjoint train/validation/test partitions of one table
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub train: FeatureTable,
    pub validation: FeatureTable,
    pub test: FeatureTable,
}

impl DataSplit {
    /// Fail unless both held-out partitions have at least one row.
    pub fn ensure_holdouts(&self) -> Result<()> {
        for (name, part) in [("validation", &self.validation), ("test", &self.test)] {
            if part.n_samples() == 0 {
                return Err(Error::invalid_parameter(name, 0, "partition is empty; raise its fraction"));
            }
        }
        Ok(())
    }
}

fn check_fraction(name: &'static str, f: f64) -> Result<()> {
    if !(0.0..1.0).contains(&f) {
        return Err(Error::invalid_parameter(name, f, "must be in [0, 1)"));
    }
    Ok(())
}

fn shuffled_rows(n: usize, seed: u64) -> Vec<usize> {
    let mut rows: Vec<usize> = (0..n).collect();
    rows.shuffle(&mut StdRng::seed_from_u64(seed));
    rows
}

/// Shuffle the rows with `seed` and cut them into train, validation and
/// test partitions. Partition sizes are rounded; train keeps the rest and
/// must not be empty.
pub fn train_validation_test_split(table: &FeatureTable, fractions: SplitFractions, seed: u64) -> Result<DataSplit> {
    check_fraction("validation", fractions.validation)?;
    check_fraction("test", fractions.test)?;

    let n = table.n_samples();
    let n_test = (n as f64 * fractions.test).round() as usize;
    let n_val = (n as f64 * fractions.validation).round() as usize;
    if n_test + n_val >= n {
        return Err(Error::invalid_parameter(
            "fractions",
            format!("{}+{}", fractions.validation, fractions.test),
            format!("no training rows left out of {}", n),
        ));
    }

    let rows = shuffled_rows(n, seed);
    let (test, rest) = rows.split_at(n_test);
    let (validation, train) = rest.split_at(n_val);
    debug!(train = train.len(), validation = validation.len(), test = test.len(), "split table");

    Ok(DataSplit {
        train: table.take_rows(train)?,
        validation: table.take_rows(validation)?,
        test: table.take_rows(test)?,
    })
}

/// Shuffle and split into `(train, test)`.
pub fn train_test_split(table: &FeatureTable, test_fraction: f64, seed: u64) -> Result<(FeatureTable, FeatureTable)> {
    let split = train_validation_test_split(
        table,
        SplitFractions {
            validation: 0.0,
            test: test_fraction,
        },
        seed,
    )?;
    Ok((split.train, split.test))
}

/// Score of one candidate in a [`sweep`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepScore {
    /// Position of the candidate in the input slice
    pub index: usize,
    pub label: String,
    pub train_rmse: f64,
    pub validation_rmse: f64,
}

/// Fit every candidate on `train` and score it on `validation`.
///
/// Returns one score per candidate, best (lowest validation RMSE) first.
pub fn sweep(candidates: &[RegressorKind], train: &FeatureTable, validation: &FeatureTable) -> Result<Vec<SweepScore>> {
    if candidates.is_empty() {
        return Err(Error::invalid_parameter("candidates", "[]", "nothing to compare"));
    }
    if validation.n_samples() == 0 {
        return Err(Error::InvalidInput("validation table has no rows".into()));
    }

    let mut scores = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let model = candidate.fit(train.features(), train.target())?;
            let train_rmse = rmse(train.target(), model.predict(train.features())?.view())?;
            let validation_rmse = rmse(validation.target(), model.predict(validation.features())?.view())?;
            debug!(label = %candidate.label(), train_rmse, validation_rmse, "sweep candidate scored");
            Ok(SweepScore {
                index,
                label: candidate.label(),
                train_rmse,
                validation_rmse,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    scores.sort_by(|a, b| a.validation_rmse.total_cmp(&b.validation_rmse));
    Ok(scores)
}
