//! Multispectral image stack

use crate::error::{Error, Result};
use ndarray::{s, Array2, Array3, Array4, ArrayView2, ArrayView3, ArrayView4, Axis};
use std::path::PathBuf;

/// A stack of equally sized multispectral images.
///
/// Data is stored as a 4D array indexed `(image, band, row, col)`. Bands
/// are fixed-order channels shared by every image in the stack.
///
/// # Example
///
/// ```ignore
/// use geolearn_core::ImageStack;
///
/// let stack = ImageStack::from_images(vec![img_a, img_b])?;
/// let rgb = stack.select_bands(&[3, 2, 1])?;
/// ```
#[derive(Debug, Clone)]
pub struct ImageStack {
    data: Array4<f64>,
    /// Source file of each image, empty when built in memory
    sources: Vec<PathBuf>,
}

impl ImageStack {
    /// Wrap an existing `(image, band, row, col)` array.
    pub fn new(data: Array4<f64>) -> Self {
        Self {
            data,
            sources: Vec::new(),
        }
    }

    /// Build a stack from per-image `(band, row, col)` arrays.
    ///
    /// Every image must share the shape of the first one.
    pub fn from_images(images: Vec<Array3<f64>>) -> Result<Self> {
        let first = images
            .first()
            .ok_or_else(|| Error::InvalidInput("image stack needs at least one image".into()))?;
        let (bands, rows, cols) = first.dim();

        for image in &images[1..] {
            if image.dim() != (bands, rows, cols) {
                return Err(Error::shape((bands, rows, cols), image.dim()));
            }
        }

        let mut data = Array4::zeros((images.len(), bands, rows, cols));
        for (mut slot, image) in data.axis_iter_mut(Axis(0)).zip(images.iter()) {
            slot.assign(image);
        }

        Ok(Self::new(data))
    }

    /// Attach the source path of each image.
    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Result<Self> {
        if sources.len() != self.n_images() {
            return Err(Error::shape(
                format!("{} source paths", self.n_images()),
                sources.len(),
            ));
        }
        self.sources = sources;
        Ok(self)
    }

    // Dimensions

    pub fn n_images(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn n_bands(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Spatial size as (rows, cols)
    pub fn spatial_shape(&self) -> (usize, usize) {
        let (_, _, rows, cols) = self.data.dim();
        (rows, cols)
    }

    /// Full shape as (images, bands, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        self.data.dim()
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    // Data access

    pub fn view(&self) -> ArrayView4<'_, f64> {
        self.data.view()
    }

    pub fn data(&self) -> &Array4<f64> {
        &self.data
    }

    pub fn into_array(self) -> Array4<f64> {
        self.data
    }

    /// One image as a `(band, row, col)` view
    pub fn image(&self, index: usize) -> Result<ArrayView3<'_, f64>> {
        self.check_image(index)?;
        Ok(self.data.index_axis(Axis(0), index))
    }

    /// One band of one image as a `(row, col)` view
    pub fn band(&self, image: usize, band: usize) -> Result<ArrayView2<'_, f64>> {
        self.check_image(image)?;
        if band >= self.n_bands() {
            return Err(Error::IndexOutOfRange {
                index: band,
                len: self.n_bands(),
            });
        }
        Ok(self.data.slice(s![image, band, .., ..]))
    }

    /// New stack keeping only `bands`, in the given order.
    pub fn select_bands(&self, bands: &[usize]) -> Result<Self> {
        check_indices(bands, self.n_bands())?;
        Ok(Self {
            data: self.data.select(Axis(1), bands),
            sources: self.sources.clone(),
        })
    }

    /// Pixel matrix of one image: one row per pixel (row-major), one column
    /// per selected band.
    pub fn pixels(&self, image: usize, bands: &[usize]) -> Result<Array2<f64>> {
        self.check_image(image)?;
        check_indices(bands, self.n_bands())?;
        let (rows, cols) = self.spatial_shape();
        let mut out = Array2::zeros((rows * cols, bands.len()));
        for (j, &b) in bands.iter().enumerate() {
            let band = self.data.slice(s![image, b, .., ..]);
            for (dst, &v) in out.column_mut(j).iter_mut().zip(band.iter()) {
                *dst = v;
            }
        }
        Ok(out)
    }

    /// Pixel matrices of several images stacked vertically, in the given order.
    pub fn pixels_of(&self, images: &[usize], bands: &[usize]) -> Result<Array2<f64>> {
        check_indices(images, self.n_images())?;
        let parts = images
            .iter()
            .map(|&i| self.pixels(i, bands))
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
        Ok(ndarray::concatenate(Axis(0), &views)?)
    }

    fn check_image(&self, index: usize) -> Result<()> {
        if index >= self.n_images() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.n_images(),
            });
        }
        Ok(())
    }
}

/// Reject empty index lists and indices past `len`.
pub(crate) fn check_indices(indices: &[usize], len: usize) -> Result<()> {
    if indices.is_empty() {
        return Err(Error::invalid_parameter(
            "indices",
            "[]",
            "at least one index is required",
        ));
    }
    if let Some(&bad) = indices.iter().find(|&&i| i >= len) {
        return Err(Error::IndexOutOfRange { index: bad, len });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(bands: usize, rows: usize, cols: usize, base: f64) -> Array3<f64> {
        Array3::from_shape_fn((bands, rows, cols), |(b, r, c)| {
            base + (b * 100 + r * 10 + c) as f64
        })
    }

    #[test]
    fn test_from_images() {
        let stack = ImageStack::from_images(vec![image(3, 2, 4, 0.0), image(3, 2, 4, 1000.0)]).unwrap();
        assert_eq!(stack.shape(), (2, 3, 2, 4));
        assert_eq!(stack.band(1, 2).unwrap()[[1, 3]], 1213.0);
    }

    #[test]
    fn test_from_images_shape_mismatch() {
        let result = ImageStack::from_images(vec![image(3, 2, 4, 0.0), image(3, 4, 2, 0.0)]);
        assert!(matches!(result, Err(Error::InvalidShape { .. })));
    }

    #[test]
    fn test_from_images_empty() {
        assert!(ImageStack::from_images(Vec::new()).is_err());
    }

    #[test]
    fn test_select_bands_order() {
        let stack = ImageStack::from_images(vec![image(4, 2, 2, 0.0)]).unwrap();
        let sel = stack.select_bands(&[3, 0]).unwrap();
        assert_eq!(sel.n_bands(), 2);
        assert_eq!(sel.band(0, 0).unwrap(), stack.band(0, 3).unwrap());
        assert_eq!(sel.band(0, 1).unwrap(), stack.band(0, 0).unwrap());
    }

    #[test]
    fn test_select_bands_out_of_range() {
        let stack = ImageStack::from_images(vec![image(4, 2, 2, 0.0)]).unwrap();
        assert!(matches!(
            stack.select_bands(&[1, 4]),
            Err(Error::IndexOutOfRange { index: 4, len: 4 })
        ));
        assert!(stack.select_bands(&[]).is_err());
    }

    #[test]
    fn test_pixels_layout() {
        let stack = ImageStack::from_images(vec![image(3, 2, 3, 0.0)]).unwrap();
        let px = stack.pixels(0, &[2, 0]).unwrap();
        assert_eq!(px.dim(), (6, 2));
        // pixel (1, 2) is row 1 * 3 + 2 = 5
        assert_eq!(px[[5, 0]], 212.0);
        assert_eq!(px[[5, 1]], 12.0);
    }

    #[test]
    fn test_pixels_of_concatenates() {
        let stack =
            ImageStack::from_images(vec![image(2, 2, 2, 0.0), image(2, 2, 2, 1000.0)]).unwrap();
        let px = stack.pixels_of(&[1, 0], &[0]).unwrap();
        assert_eq!(px.dim(), (8, 1));
        assert_eq!(px[[0, 0]], 1000.0);
        assert_eq!(px[[4, 0]], 0.0);
    }

    #[test]
    fn test_sources_length_checked() {
        let stack = ImageStack::from_images(vec![image(1, 1, 1, 0.0)]).unwrap();
        assert!(stack.clone().with_sources(vec![]).is_err());
        let stack = stack.with_sources(vec![PathBuf::from("a.tif")]).unwrap();
        assert_eq!(stack.sources().len(), 1);
    }
}
