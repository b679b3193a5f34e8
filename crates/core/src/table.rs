//! Tabular features paired with a regression target

use crate::error::{Error, Result};
use crate::stack::check_indices;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// A `(sample, feature)` matrix with one target value per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    features: Array2<f64>,
    target: Array1<f64>,
    feature_names: Vec<String>,
    target_name: String,
}

impl FeatureTable {
    /// Create a table, checking that rows and names line up.
    pub fn new(
        features: Array2<f64>,
        target: Array1<f64>,
        feature_names: Vec<String>,
        target_name: impl Into<String>,
    ) -> Result<Self> {
        if features.nrows() != target.len() {
            return Err(Error::shape(
                format!("{} target values", features.nrows()),
                target.len(),
            ));
        }
        if features.ncols() != feature_names.len() {
            return Err(Error::shape(
                format!("{} feature names", features.ncols()),
                feature_names.len(),
            ));
        }
        Ok(Self {
            features,
            target,
            feature_names,
            target_name: target_name.into(),
        })
    }

    /// Create a table with generated feature names `x0, x1, ...`.
    pub fn unnamed(features: Array2<f64>, target: Array1<f64>) -> Result<Self> {
        let names = (0..features.ncols()).map(|i| format!("x{}", i)).collect();
        Self::new(features, target, names, "y")
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn target(&self) -> ArrayView1<'_, f64> {
        self.target.view()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Column index of a named feature
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    /// New table keeping only the given feature columns, in order.
    pub fn select_features(&self, indices: &[usize]) -> Result<Self> {
        check_indices(indices, self.n_features())?;
        Ok(Self {
            features: self.features.select(Axis(1), indices),
            target: self.target.clone(),
            feature_names: indices.iter().map(|&i| self.feature_names[i].clone()).collect(),
            target_name: self.target_name.clone(),
        })
    }

    /// Same as [`select_features`](Self::select_features) but by column name.
    pub fn select_by_name(&self, names: &[&str]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|name| {
                self.feature_index(name).ok_or_else(|| {
                    Error::invalid_parameter("feature", name, "no such column")
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.select_features(&indices)
    }

    /// New table with the given rows, in order. Duplicates are allowed.
    pub fn take_rows(&self, rows: &[usize]) -> Result<Self> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.n_samples()) {
            return Err(Error::IndexOutOfRange {
                index: bad,
                len: self.n_samples(),
            });
        }
        Ok(Self {
            features: self.features.select(Axis(0), rows),
            target: self.target.select(Axis(0), rows),
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
        })
    }

    /// Replace the feature matrix, keeping names and target.
    pub fn with_features(&self, features: Array2<f64>) -> Result<Self> {
        Self::new(
            features,
            self.target.clone(),
            self.feature_names.clone(),
            self.target_name.clone(),
        )
    }
}

/// A feature table together with a human-readable description.
#[derive(Debug, Clone)]
pub struct TabularDataset {
    pub table: FeatureTable,
    pub description: String,
}

impl TabularDataset {
    /// Wrap a table with a generated summary description.
    pub fn describe(table: FeatureTable) -> Self {
        let description = summarize(&table);
        Self { table, description }
    }
}

fn summarize(table: &FeatureTable) -> String {
    let mut out = format!(
        "{} samples, {} features, target '{}'\n",
        table.n_samples(),
        table.n_features(),
        table.target_name()
    );
    let features = table.features();
    let columns = table
        .feature_names()
        .iter()
        .zip(features.axis_iter(Axis(1)))
        .chain(std::iter::once((&table.target_name, table.target())));
    for (name, column) in columns {
        let (min, max, mean) = column_summary(column);
        out.push_str(&format!(
            "  {:<16} min {:>12.4}  max {:>12.4}  mean {:>12.4}\n",
            name, min, max, mean
        ));
    }
    out
}

fn column_summary(column: ArrayView1<'_, f64>) -> (f64, f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in column.iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
        sum += v;
        count += 1;
    }
    if count == 0 {
        return (f64::NAN, f64::NAN, f64::NAN);
    }
    (min, max, sum / count as f64)
}
