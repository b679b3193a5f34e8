//! End-to-end workflows built from the algorithm modules

mod experiment;
mod segmentation;

pub use experiment::{ExperimentReport, RegressionExperiment};
pub use segmentation::{fit_segmenter, SegmentationConfig, Segmenter};
