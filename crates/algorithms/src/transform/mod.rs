//! Data wrangling between loading and fitting
//!
//! - Selection: keep a subset of bands or features, in a given order
//! - Normalization: per-channel min-max to [0, 1] with an explicit
//!   policy for constant channels
//! - Composites: RGB band triplets for display
//! - Scalers: standard, robust and min-max scaling fitted on training rows

mod composite;
mod normalize;
mod scale;
mod select;

pub use composite::{display_composite, rgb_composite, to_rgb8, SENTINEL2_RGB};
pub use normalize::{channel_ranges, normalize_channels, normalize_image, ChannelRange, ConstantChannel};
pub use scale::{Scaler, ScalerState};
pub use select::select_indices;
