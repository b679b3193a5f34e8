//! RGB composites from multispectral stacks

use super::normalize::{normalize_image, ConstantChannel};
use geolearn_core::{Error, ImageStack, Result};
use ndarray::{Array3, ArrayView3, Axis};

/// Band indices of B04 (red), B03 (green), B02 (blue) in a Sentinel-2 stack
/// ordered B01, B02, ..., B12.
pub const SENTINEL2_RGB: [usize; 3] = [3, 2, 1];

/// Copy the three `rgb` bands of one image into a `(3, row, col)` array.
///
/// Values are copied as stored, without any rescaling.
pub fn rgb_composite(stack: &ImageStack, image: usize, rgb: [usize; 3]) -> Result<Array3<f64>> {
    let image = stack.image(image)?;
    super::select_indices(image, Axis(0), &rgb)
}

/// RGB composite with each channel min-max normalized to [0, 1].
pub fn display_composite(
    stack: &ImageStack,
    image: usize,
    rgb: [usize; 3],
    policy: ConstantChannel,
) -> Result<Array3<f64>> {
    let composite = rgb_composite(stack, image, rgb)?;
    normalize_image(composite.view(), policy)
}

/// Interleave a normalized `(3, row, col)` composite into 8-bit RGB bytes.
///
/// Values are clamped to [0, 1]; NaN becomes 0.
pub fn to_rgb8(composite: ArrayView3<'_, f64>) -> Result<Vec<u8>> {
    let (channels, rows, cols) = composite.dim();
    if channels != 3 {
        return Err(Error::shape("3 channels", channels));
    }
    let mut out = Vec::with_capacity(rows * cols * 3);
    for r in 0..rows {
        for c in 0..cols {
            for ch in 0..3 {
                let v = composite[[ch, r, c]];
                let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
                out.push((v * 255.0).round() as u8);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geolearn_core::io::{read_multiband_from_buffer, write_multiband_to_buffer};

    fn stack() -> ImageStack {
        let img = Array3::from_shape_fn((12, 3, 4), |(b, r, c)| {
            1000.0 + b as f64 * 17.25 + r as f64 * 3.5 + c as f64
        });
        ImageStack::from_images(vec![img]).unwrap()
    }

    #[test]
    fn test_composite_copies_bands() {
        let s = stack();
        let rgb = rgb_composite(&s, 0, SENTINEL2_RGB).unwrap();
        assert_eq!(rgb.dim(), (3, 3, 4));
        for (ch, &band) in SENTINEL2_RGB.iter().enumerate() {
            assert_eq!(rgb.index_axis(Axis(0), ch), s.band(0, band).unwrap());
        }
    }

    #[test]
    fn test_composite_roundtrip_through_tiff() {
        let s = stack();
        let bytes = write_multiband_to_buffer(s.image(0).unwrap()).unwrap();
        let reloaded = ImageStack::from_images(vec![read_multiband_from_buffer(&bytes).unwrap()]).unwrap();
        assert_eq!(
            rgb_composite(&reloaded, 0, SENTINEL2_RGB).unwrap(),
            rgb_composite(&s, 0, SENTINEL2_RGB).unwrap()
        );
    }

    #[test]
    fn test_display_composite_range() {
        let out = display_composite(&stack(), 0, SENTINEL2_RGB, ConstantChannel::Zero).unwrap();
        assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_bad_band() {
        assert!(rgb_composite(&stack(), 0, [12, 1, 0]).is_err());
        assert!(rgb_composite(&stack(), 1, SENTINEL2_RGB).is_err());
    }

    #[test]
    fn test_to_rgb8() {
        let mut c = Array3::zeros((3, 1, 2));
        c[[0, 0, 0]] = 1.0;
        c[[1, 0, 1]] = 0.5;
        c[[2, 0, 1]] = f64::NAN;
        assert_eq!(to_rgb8(c.view()).unwrap(), vec![255, 0, 0, 0, 128, 0]);
        assert!(to_rgb8(Array3::zeros((2, 1, 1)).view()).is_err());
    }
}
