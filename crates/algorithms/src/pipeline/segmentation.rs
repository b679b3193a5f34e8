//! K-means segmentation fitted on some images and applied to any image
//!
//! Pixels of the training images are pooled (optionally subsampled and
//! scaled) to fit one k-means model, so cluster labels are consistent
//! across every image segmented with the same [`Segmenter`].

use crate::cluster::{kmeans, KMeansModel, KMeansParams};
use crate::transform::{Scaler, ScalerState};
use geolearn_core::{ImageStack, LabelMap, Result};
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How to build pixel features and cluster them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Bands used as features; empty means every band
    pub bands: Vec<usize>,
    /// Optional per-band scaling fitted on the training pixels
    pub scaler: Option<Scaler>,
    pub kmeans: KMeansParams,
    /// Random subsample of training pixels; `None` uses all of them
    pub max_training_pixels: Option<usize>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            bands: Vec::new(),
            scaler: Some(Scaler::MinMax),
            kmeans: KMeansParams::default(),
            max_training_pixels: Some(100_000),
        }
    }
}

/// A fitted pixel clustering
#[derive(Debug, Clone)]
pub struct Segmenter {
    bands: Vec<usize>,
    scaler: Option<ScalerState>,
    model: KMeansModel,
}

fn resolve_bands(bands: &[usize], stack: &ImageStack) -> Vec<usize> {
    if bands.is_empty() {
        (0..stack.n_bands()).collect()
    } else {
        bands.to_vec()
    }
}

/// Fit a [`Segmenter`] on the pixels of `training_images`.
pub fn fit_segmenter(stack: &ImageStack, training_images: &[usize], config: &SegmentationConfig) -> Result<Segmenter> {
    let bands = resolve_bands(&config.bands, stack);
    let mut samples = stack.pixels_of(training_images, &bands)?;

    if let Some(limit) = config.max_training_pixels.filter(|&m| m < samples.nrows()) {
        let mut rng = StdRng::seed_from_u64(config.kmeans.seed);
        let mut rows = rand::seq::index::sample(&mut rng, samples.nrows(), limit).into_vec();
        rows.sort_unstable();
        debug!(from = samples.nrows(), to = limit, "subsampled training pixels");
        samples = samples.select(Axis(0), &rows);
    }

    let scaler = match config.scaler {
        Some(kind) => {
            let state = kind.fit(samples.view())?;
            samples = state.transform(samples.view())?;
            Some(state)
        }
        None => None,
    };

    let model = kmeans(samples.view(), &config.kmeans)?;
    info!(
        k = model.k(),
        pixels = samples.nrows(),
        inertia = model.inertia,
        "segmenter fitted"
    );

    Ok(Segmenter { bands, scaler, model })
}

impl Segmenter {
    pub fn model(&self) -> &KMeansModel {
        &self.model
    }

    pub fn bands(&self) -> &[usize] {
        &self.bands
    }

    /// Label every pixel of `image` in `stack`.
    pub fn segment(&self, stack: &ImageStack, image: usize) -> Result<LabelMap> {
        let (rows, cols) = stack.spatial_shape();
        let mut pixels = stack.pixels(image, &self.bands)?;
        if let Some(state) = &self.scaler {
            pixels = state.transform(pixels.view())?;
        }
        let labels = self.model.predict(pixels.view())?;
        LabelMap::from_flat(labels.to_vec(), rows, cols, self.model.k())
    }
}
