//! Per-segment statistics over a label map
//!
//! For each label, the mean spectrum of its pixels. NaN pixel values are
//! skipped; a band with no valid pixel in a segment yields NaN.

use geolearn_core::{Error, LabelMap, Result};
use ndarray::{Array2, Array3, ArrayView3, Axis};

fn check_shape(image: ArrayView3<'_, f64>, labels: &LabelMap) -> Result<()> {
    let (_, rows, cols) = image.dim();
    if labels.shape() != (rows, cols) {
        return Err(Error::shape(labels.shape(), (rows, cols)));
    }
    Ok(())
}

/// Mean value of every band inside every segment, shape `(n_labels, bands)`.
pub fn segment_means(image: ArrayView3<'_, f64>, labels: &LabelMap) -> Result<Array2<f64>> {
    check_shape(image, labels)?;
    let bands = image.len_of(Axis(0));
    let mut sums = Array2::<f64>::zeros((labels.n_labels(), bands));
    let mut counts = Array2::<usize>::zeros((labels.n_labels(), bands));

    for (b, band) in image.axis_iter(Axis(0)).enumerate() {
        for (&v, &l) in band.iter().zip(labels.view().iter()) {
            if v.is_nan() {
                continue;
            }
            sums[[l as usize, b]] += v;
            counts[[l as usize, b]] += 1;
        }
    }

    Ok(ndarray::Zip::from(&sums)
        .and(&counts)
        .map_collect(|&s, &n| if n == 0 { f64::NAN } else { s / n as f64 }))
}

/// Replace every pixel by the mean spectrum of its segment.
pub fn mean_image(image: ArrayView3<'_, f64>, labels: &LabelMap) -> Result<Array3<f64>> {
    let means = segment_means(image, labels)?;
    let (bands, rows, cols) = image.dim();
    let view = labels.view();
    Ok(Array3::from_shape_fn((bands, rows, cols), |(b, r, c)| {
        means[[view[[r, c]] as usize, b]]
    }))
}

/// Paint segment boundaries onto an image with a fixed per-band colour.
///
/// A pixel is a boundary when its right or bottom neighbour carries another
/// label (see [`LabelMap::boundaries`]).
pub fn mark_boundaries(image: ArrayView3<'_, f64>, labels: &LabelMap, colour: &[f64]) -> Result<Array3<f64>> {
    check_shape(image, labels)?;
    let bands = image.len_of(Axis(0));
    if colour.len() != bands {
        return Err(Error::shape(format!("{} colour values", bands), colour.len()));
    }
    let edges = labels.boundaries();
    let mut out = image.to_owned();
    for (mut band, &value) in out.axis_iter_mut(Axis(0)).zip(colour) {
        ndarray::Zip::from(&mut band).and(&edges).for_each(|v, &edge| {
            if edge {
                *v = value;
            }
        });
    }
    Ok(out)
}
