//! Per-channel min-max normalization
//!
//! Each channel (one index along the chosen axis) is rescaled independently
//! so its minimum maps to 0 and its maximum to 1. NaN cells are ignored
//! when computing the range and stay NaN in the output.

use geolearn_core::{Error, Result};
use ndarray::{Array, Array3, ArrayView, ArrayView3, Axis, RemoveAxis};
use serde::{Deserialize, Serialize};

/// What to do with a channel whose minimum equals its maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConstantChannel {
    /// Map every valid cell of the channel to 0.0
    #[default]
    Zero,
    /// Leave the channel values untouched
    Unscaled,
    /// Fail with `DegenerateInput`
    Error,
}

/// Value range of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelRange {
    pub min: f64,
    pub max: f64,
}

impl ChannelRange {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_constant(&self) -> bool {
        self.span() == 0.0
    }
}

/// Range of every channel along `axis`; `None` for channels with no finite value.
pub fn channel_ranges<D: RemoveAxis>(array: ArrayView<'_, f64, D>, axis: Axis) -> Result<Vec<Option<ChannelRange>>> {
    check_axis(array.ndim(), axis)?;
    Ok(array
        .axis_iter(axis)
        .map(|channel| {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for &v in channel.iter().filter(|v| v.is_finite()) {
                min = min.min(v);
                max = max.max(v);
            }
            (min <= max).then_some(ChannelRange { min, max })
        })
        .collect())
}

/// Min-max normalize every channel along `axis` to [0, 1].
pub fn normalize_channels<D: RemoveAxis>(
    array: ArrayView<'_, f64, D>,
    axis: Axis,
    policy: ConstantChannel,
) -> Result<Array<f64, D>> {
    let ranges = channel_ranges(array.view(), axis)?;
    let mut out = array.to_owned();

    for (channel_idx, (mut channel, range)) in out.axis_iter_mut(axis).zip(ranges).enumerate() {
        let Some(range) = range else { continue };

        if range.is_constant() {
            match policy {
                ConstantChannel::Zero => channel.mapv_inplace(|v| if v.is_finite() { 0.0 } else { v }),
                ConstantChannel::Unscaled => {}
                ConstantChannel::Error => {
                    return Err(Error::DegenerateInput {
                        channel: channel_idx,
                        value: range.min,
                    })
                }
            }
            continue;
        }

        let span = range.span();
        channel.mapv_inplace(|v| if v.is_finite() { (v - range.min) / span } else { v });
    }

    Ok(out)
}

/// Normalize the bands of a `(band, row, col)` image.
pub fn normalize_image(image: ArrayView3<'_, f64>, policy: ConstantChannel) -> Result<Array3<f64>> {
    normalize_channels(image, Axis(0), policy)
}

fn check_axis(ndim: usize, axis: Axis) -> Result<()> {
    if axis.index() >= ndim {
        return Err(Error::invalid_parameter(
            "axis",
            axis.index(),
            format!("array has {} dimensions", ndim),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn two_band_image() -> Array3<f64> {
        let mut image = Array3::zeros((2, 2, 2));
        image
            .index_axis_mut(Axis(0), 0)
            .assign(&array![[0.0, 10.0], [20.0, 30.0]]);
        image.index_axis_mut(Axis(0), 1).fill(5.0);
        image
    }

    #[test]
    fn test_normalize_varying_band() {
        let out = normalize_image(two_band_image().view(), ConstantChannel::Zero).unwrap();
        let band = out.index_axis(Axis(0), 0);
        assert_relative_eq!(band[[0, 0]], 0.0);
        assert_relative_eq!(band[[0, 1]], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(band[[1, 0]], 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(band[[1, 1]], 1.0);
    }

    #[test]
    fn test_constant_band_policies() {
        let image = two_band_image();

        let zero = normalize_image(image.view(), ConstantChannel::Zero).unwrap();
        assert!(zero.index_axis(Axis(0), 1).iter().all(|&v| v == 0.0));

        let unscaled = normalize_image(image.view(), ConstantChannel::Unscaled).unwrap();
        assert!(unscaled.index_axis(Axis(0), 1).iter().all(|&v| v == 5.0));

        let err = normalize_image(image.view(), ConstantChannel::Error);
        assert!(matches!(
            err,
            Err(Error::DegenerateInput { channel: 1, .. })
        ));
    }

    #[test]
    fn test_output_in_unit_range() {
        let a = Array2::from_shape_fn((4, 50), |(r, c)| ((r * 37 + c * 11) % 23) as f64 * 0.7 - 3.0);
        let out = normalize_channels(a.view(), Axis(0), ConstantChannel::Zero).unwrap();
        for row in out.rows() {
            let min = row.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(min, 0.0);
            assert_eq!(max, 1.0);
        }
    }

    #[test]
    fn test_nan_preserved_and_ignored() {
        let a = array![[f64::NAN, 2.0, 4.0]];
        let out = normalize_channels(a.view(), Axis(0), ConstantChannel::Zero).unwrap();
        assert!(out[[0, 0]].is_nan());
        assert_eq!(out[[0, 1]], 0.0);
        assert_eq!(out[[0, 2]], 1.0);
    }

    #[test]
    fn test_all_nan_channel() {
        let a = array![[f64::NAN, f64::NAN], [1.0, 2.0]];
        let ranges = channel_ranges(a.view(), Axis(0)).unwrap();
        assert!(ranges[0].is_none());
        let out = normalize_channels(a.view(), Axis(0), ConstantChannel::Error).unwrap();
        assert!(out[[0, 0]].is_nan());
    }

    #[test]
    fn test_bad_axis() {
        let a = array![[1.0]];
        assert!(normalize_channels(a.view(), Axis(3), ConstantChannel::Zero).is_err());
    }
}
