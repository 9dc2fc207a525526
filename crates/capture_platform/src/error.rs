//! Platform Error Types

use thiserror::Error;

/// Errors from the cpal-backed device adapter.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("no audio devices found")]
    NoDevicesFound,

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to build stream: {0}")]
    StreamBuildError(String),

    #[error("failed to start stream: {0}")]
    StreamPlayError(String),

    #[error("unsupported stream configuration: {0}")]
    UnsupportedConfig(String),
}
