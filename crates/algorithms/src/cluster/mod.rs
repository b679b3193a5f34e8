//! Unsupervised segmentation of multispectral images
//!
//! - **K-means**: spectral clustering of pixels, ignoring position
//! - **SLIC**: superpixels clustered in joint spectral and spatial space
//! - **Segment statistics**: per-segment mean spectra and boundary overlays

mod kmeans;
mod segments;
mod slic;

pub use kmeans::{image_samples, kmeans, kmeans_image, KMeans, KMeansModel, KMeansParams};
pub use segments::{mark_boundaries, mean_image, segment_means};
pub use slic::{slic, SlicParams};
