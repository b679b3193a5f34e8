//! K-means clustering for multispectral pixels
//!
//! Partitions samples (one row per pixel, one column per band) into k
//! clusters by iteratively assigning each sample to its nearest centroid
//! and moving centroids to the mean of their members. Initialization uses
//! k-means++ seeding from a seeded RNG, so results are reproducible for a
//! given seed but labels are otherwise arbitrary.

use crate::maybe_rayon::*;
use geolearn_core::{Error, LabelMap, Result};
use ndarray::{Array1, Array2, ArrayView2, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters for K-means clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansParams {
    /// Number of clusters (default: 8)
    pub k: usize,
    /// Maximum Lloyd iterations per run (default: 300)
    pub max_iterations: usize,
    /// Convergence threshold relative to the mean feature variance (default: 1e-4)
    pub tolerance: f64,
    /// Independent runs with different seeds; the lowest inertia wins (default: 1)
    pub n_init: usize,
    /// Random seed for centroid seeding
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 8,
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: 1,
            seed: 42,
        }
    }
}

/// Fitted k-means state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansModel {
    /// Cluster centres, one row per cluster
    pub centroids: Array2<f64>,
    /// Sum of squared distances of training samples to their centroid
    pub inertia: f64,
    /// Lloyd iterations run by the winning initialization
    pub iterations: usize,
}

impl KMeansModel {
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.centroids.ncols()
    }

    /// Assign each sample to its nearest centroid.
    pub fn predict(&self, samples: ArrayView2<'_, f64>) -> Result<Array1<u32>> {
        geolearn_core::check_predict_input(samples, self.n_features())?;
        let d = self.n_features();
        let data = flatten(samples);
        let centroids = flatten(self.centroids.view());

        let labels: Vec<u32> = (0..samples.nrows())
            .into_par_iter()
            .map(|i| nearest_centroid(&data[i * d..(i + 1) * d], &centroids, d).0 as u32)
            .collect();
        Ok(Array1::from_vec(labels))
    }

    /// Label every pixel of a `(band, row, col)` image.
    ///
    /// The image must have as many bands as the model has features.
    pub fn predict_image(&self, image: ArrayView3<'_, f64>) -> Result<LabelMap> {
        let (_, rows, cols) = image.dim();
        let samples = image_samples(image);
        let labels = self.predict(samples.view())?;
        LabelMap::from_flat(labels.to_vec(), rows, cols, self.k())
    }
}

/// K-means estimator holding its parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    pub params: KMeansParams,
}

impl KMeans {
    pub fn new(params: KMeansParams) -> Self {
        Self { params }
    }

    /// See [`kmeans`].
    pub fn fit(&self, samples: ArrayView2<'_, f64>) -> Result<KMeansModel> {
        kmeans(samples, &self.params)
    }
}

/// Fit k-means on `samples` (rows = samples, columns = features).
///
/// # Errors
/// - `InvalidParameter` if `k == 0`, `n_init == 0`, `max_iterations == 0`,
///   or there are fewer samples than clusters
/// - `InvalidInput` if any sample value is not finite
pub fn kmeans(samples: ArrayView2<'_, f64>, params: &KMeansParams) -> Result<KMeansModel> {
    validate(samples, params)?;

    let n = samples.nrows();
    let d = samples.ncols();
    let data = flatten(samples);
    let tolerance = params.tolerance * mean_variance(samples);

    let mut best: Option<KMeansModel> = None;
    for run in 0..params.n_init {
        let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(run as u64));
        let mut centroids = kmeans_plus_plus(&data, n, d, params.k, &mut rng);
        let mut iterations = 0;

        for iter in 0..params.max_iterations {
            iterations = iter + 1;

            // Assignment step: nearest centroid for each sample
            let labels: Vec<usize> = (0..n)
                .into_par_iter()
                .map(|i| nearest_centroid(&data[i * d..(i + 1) * d], &centroids, d).0)
                .collect();

            // Update step: recompute centroids
            let mut sums = vec![0.0; params.k * d];
            let mut counts = vec![0usize; params.k];
            for (i, &label) in labels.iter().enumerate() {
                counts[label] += 1;
                for (s, &v) in sums[label * d..(label + 1) * d].iter_mut().zip(&data[i * d..(i + 1) * d]) {
                    *s += v;
                }
            }

            let mut shift = 0.0;
            for c in 0..params.k {
                if counts[c] == 0 {
                    continue; // Keep empty cluster centroid
                }
                for j in 0..d {
                    let updated = sums[c * d + j] / counts[c] as f64;
                    shift += (updated - centroids[c * d + j]).powi(2);
                    centroids[c * d + j] = updated;
                }
            }

            if shift <= tolerance {
                break;
            }
        }

        // Summed in sample order so the result does not depend on the thread count
        let distances: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|i| nearest_centroid(&data[i * d..(i + 1) * d], &centroids, d).1)
            .collect();
        let inertia: f64 = distances.iter().sum();
        debug!(run, iterations, inertia, "k-means run finished");

        if best.as_ref().map_or(true, |b| inertia < b.inertia) {
            best = Some(KMeansModel {
                centroids: Array2::from_shape_vec((params.k, d), centroids)?,
                inertia,
                iterations,
            });
        }
    }

    best.ok_or_else(|| Error::Algorithm("k-means produced no run".into()))
}

/// Fit k-means on the pixels of one `(band, row, col)` image and label it.
pub fn kmeans_image(image: ArrayView3<'_, f64>, params: &KMeansParams) -> Result<(KMeansModel, LabelMap)> {
    let samples = image_samples(image);
    let model = kmeans(samples.view(), params)?;
    let labels = model.predict_image(image)?;
    Ok((model, labels))
}

/// Reshape a `(band, row, col)` image into a `(pixel, band)` matrix.
pub fn image_samples(image: ArrayView3<'_, f64>) -> Array2<f64> {
    let (bands, rows, cols) = image.dim();
    let mut samples = Array2::zeros((rows * cols, bands));
    for (b, band) in image.axis_iter(Axis(0)).enumerate() {
        for (dst, &v) in samples.column_mut(b).iter_mut().zip(band.iter()) {
            *dst = v;
        }
    }
    samples
}

fn validate(samples: ArrayView2<'_, f64>, params: &KMeansParams) -> Result<()> {
    if params.k == 0 {
        return Err(Error::invalid_parameter("k", params.k, "k-means requires k >= 1"));
    }
    if params.n_init == 0 {
        return Err(Error::invalid_parameter("n_init", params.n_init, "must be >= 1"));
    }
    if params.max_iterations == 0 {
        return Err(Error::invalid_parameter("max_iterations", params.max_iterations, "must be >= 1"));
    }
    if samples.ncols() == 0 {
        return Err(Error::InvalidInput("samples have no features".into()));
    }
    if samples.nrows() < params.k {
        return Err(Error::invalid_parameter(
            "k",
            params.k,
            format!("not enough samples ({}) for {} clusters", samples.nrows(), params.k),
        ));
    }
    if samples.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput("k-means samples must be finite".into()));
    }
    Ok(())
}

fn flatten(a: ArrayView2<'_, f64>) -> Vec<f64> {
    a.iter().copied().collect()
}

#[inline]
fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of and squared distance to the nearest centroid
#[inline]
fn nearest_centroid(sample: &[f64], centroids: &[f64], d: usize) -> (usize, f64) {
    let mut best_dist = f64::INFINITY;
    let mut best_k = 0;
    for (k, centroid) in centroids.chunks_exact(d).enumerate() {
        let dist = sq_dist(sample, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_k = k;
        }
    }
    (best_k, best_dist)
}

/// Mean of the per-column variances
fn mean_variance(samples: ArrayView2<'_, f64>) -> f64 {
    let n = samples.nrows() as f64;
    let total: f64 = samples
        .axis_iter(Axis(1))
        .map(|col| {
            let mean = col.sum() / n;
            col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
        })
        .sum();
    total / samples.ncols() as f64
}

/// k-means++ seeding: each new centre is drawn with probability
/// proportional to its squared distance from the closest existing centre.
fn kmeans_plus_plus(data: &[f64], n: usize, d: usize, k: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut centroids = Vec::with_capacity(k * d);
    let first = rng.gen_range(0..n);
    centroids.extend_from_slice(&data[first * d..(first + 1) * d]);

    let mut closest: Vec<f64> = (0..n)
        .map(|i| sq_dist(&data[i * d..(i + 1) * d], &centroids[..d]))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            closest
                .iter()
                .position(|&w| {
                    acc += w;
                    acc > target
                })
                .unwrap_or(n - 1)
        } else {
            // All remaining samples coincide with a centre
            rng.gen_range(0..n)
        };

        centroids.extend_from_slice(&data[chosen * d..(chosen + 1) * d]);
        let new_centre = &centroids[c * d..(c + 1) * d];
        for (i, dist) in closest.iter_mut().enumerate() {
            *dist = dist.min(sq_dist(&data[i * d..(i + 1) * d], new_centre));
        }
    }

    centroids
}
