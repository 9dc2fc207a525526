//! Capture DSP - Sample-Rate & Channel Conversion
//!
//! Everything a converting collector needs to bring an arriving buffer into
//! a common target format: polyphase sample-rate conversion and channel
//! remapping. No effects processing — per the capture engine's non-goals,
//! this stops at linear mixing and resampling.

mod convert;
mod error;
mod resample;

pub use convert::{float_to_int16, float_to_int24, int16_to_float, map_channels};
pub use error::DspError;
pub use resample::{resample_channel, resample_planar};
