//! Error types for geolearn

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for geolearn operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("NPY error: {0}")]
    Npy(String),

    /// Array dimensions inconsistent with the expected rank or extent.
    #[error("Invalid shape: expected {expected}, got {actual}")]
    InvalidShape { expected: String, actual: String },

    #[error("Index {index} out of range for axis of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// An expected data file or directory is absent.
    #[error("Missing resource: {}", .0.display())]
    MissingResource(PathBuf),

    /// Zero-variance channel where a non-degenerate one is required.
    #[error("Degenerate input: channel {channel} is constant ({value})")]
    DegenerateInput { channel: usize, value: f64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Parse error at line {line}, column '{column}': {message}")]
    Parse {
        line: u64,
        column: String,
        message: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shape error from two displayable shape descriptions.
    pub fn shape(expected: impl std::fmt::Debug, actual: impl std::fmt::Debug) -> Self {
        Error::InvalidShape {
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }

    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(e: ndarray::ShapeError) -> Self {
        Error::Other(e.to_string())
    }
}

/// Result type alias for geolearn operations
pub type Result<T> = std::result::Result<T, Error>;
