//! Per-pixel label maps produced by clustering and superpixel segmentation

use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView2};

/// Cluster or segment identifier for every pixel of one image.
///
/// Labels are `0..n_labels` and carry no meaning beyond identity: two runs
/// with different seeds may assign different numbers to the same region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Array2<u32>,
    n_labels: usize,
}

impl LabelMap {
    /// Wrap a label array; every label must be below `n_labels`.
    pub fn new(labels: Array2<u32>, n_labels: usize) -> Result<Self> {
        if let Some(&bad) = labels.iter().find(|&&l| l as usize >= n_labels) {
            return Err(Error::IndexOutOfRange {
                index: bad as usize,
                len: n_labels,
            });
        }
        Ok(Self { labels, n_labels })
    }

    /// Build from a flat row-major label vector.
    pub fn from_flat(labels: Vec<u32>, rows: usize, cols: usize, n_labels: usize) -> Result<Self> {
        if labels.len() != rows * cols {
            return Err(Error::shape(rows * cols, labels.len()));
        }
        Self::new(Array2::from_shape_vec((rows, cols), labels)?, n_labels)
    }

    pub fn n_labels(&self) -> usize {
        self.n_labels
    }

    /// Spatial size as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.labels.dim()
    }

    pub fn view(&self) -> ArrayView2<'_, u32> {
        self.labels.view()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        self.labels.get((row, col)).copied()
    }

    pub fn into_array(self) -> Array2<u32> {
        self.labels
    }

    /// Pixel count per label
    pub fn counts(&self) -> Array1<usize> {
        let mut counts = Array1::zeros(self.n_labels);
        for &l in self.labels.iter() {
            counts[l as usize] += 1;
        }
        counts
    }

    /// Pixels whose right or bottom neighbour carries a different label.
    pub fn boundaries(&self) -> Array2<bool> {
        let (rows, cols) = self.shape();
        let mut mask = Array2::from_elem((rows, cols), false);
        for r in 0..rows {
            for c in 0..cols {
                let l = self.labels[[r, c]];
                if (c + 1 < cols && self.labels[[r, c + 1]] != l)
                    || (r + 1 < rows && self.labels[[r + 1, c]] != l)
                {
                    mask[[r, c]] = true;
                }
            }
        }
        mask
    }
}
