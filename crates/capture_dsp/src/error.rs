//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during sample-rate conversion or channel mapping.
#[derive(Error, Debug)]
pub enum DspError {
    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("buffer size mismatch: expected {expected}, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },

    #[error("unsupported channel mapping: {source_channels} -> {target_channels}")]
    UnsupportedChannelMapping {
        source_channels: u16,
        target_channels: u16,
    },
}
