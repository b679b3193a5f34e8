//! Descriptive statistics for feature tables
//!
//! - **correlation**: Pearson correlation matrices and feature/target correlation

mod correlation;

pub use correlation::{correlation_matrix, target_correlations};
