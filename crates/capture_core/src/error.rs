//! Error Taxonomy
//!
//! Typed failure kinds for the capture pipeline, each optionally carrying a
//! recovery hint and a help anchor for documentation lookup. Mirrors the
//! crate-boundary error composition used throughout this workspace: one
//! `thiserror` enum per crate, joined with `#[from]`.

use std::time::Duration;

use thiserror::Error;

/// Suggested strategy for recovering from a [`CaptureError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Retry the operation up to `attempts` times, waiting `delay` between tries.
    Retry { attempts: u32, delay: Duration },
    /// Fall back to a degraded mode; the caller knows which.
    Fallback,
    /// Safe to ignore; already recorded in statistics.
    Ignore,
    /// No recovery; propagate to the caller.
    Fail,
}

/// All failure kinds produced by the capture pipeline.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("device '{0}' was disconnected")]
    DeviceDisconnected(String),

    #[error("device '{0}' is already in use")]
    DeviceInUse(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error(
        "system audio loopback permission is required; \
         grant the application audio-capture permission and retry"
    )]
    LoopbackPermission,

    #[error(
        "microphone permission is required; \
         grant the application microphone access and retry"
    )]
    MicrophonePermission,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("failed to start session: {0}")]
    SessionStartFailed(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("format conversion failed: {0}")]
    FormatConversionFailed(String),

    #[error("audio format mismatch: {0}")]
    FormatMismatch(String),

    #[error("sink is not configured")]
    OutputNotConfigured,

    #[error("file write failed: {0}")]
    FileWriteFailed(String),

    #[error("audio buffer overflow")]
    BufferOverflow,

    #[error("audio buffer underrun")]
    BufferUnderrun,

    #[error("network connection failed: {0}")]
    NetworkConnectionFailed(String),

    #[error("streaming protocol error: {0}")]
    StreamingProtocol(String),

    #[error("dsp error: {0}")]
    Dsp(#[from] capture_dsp::DspError),

    #[error("channel send failed")]
    ChannelSend,

    #[error("channel receive failed")]
    ChannelRecv,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Documentation anchor for this error kind, when one is defined.
    pub fn help_anchor(&self) -> Option<&'static str> {
        use CaptureError::*;
        match self {
            DeviceNotFound(_) | DeviceDisconnected(_) | DeviceInUse(_) => Some("devices"),
            LoopbackPermission | MicrophonePermission => Some("permissions"),
            UnsupportedFormat(_) | FormatConversionFailed(_) | FormatMismatch(_) => {
                Some("formats")
            }
            BufferOverflow | BufferUnderrun => Some("performance"),
            _ => None,
        }
    }

    /// Human-readable recovery suggestion, when one is defined.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        use CaptureError::*;
        match self {
            DeviceDisconnected(_) => Some("reconnect the audio device or select a different one"),
            FormatMismatch(_) => Some("check that all pipeline stages use compatible formats"),
            BufferOverflow => Some("reduce audio quality or close other applications"),
            BufferUnderrun => Some("the producer is not supplying data fast enough"),
            _ => None,
        }
    }

    /// Maps this error to the strategy `ErrorHandler.suggested_strategy` would pick.
    pub fn suggested_strategy(&self) -> RecoveryStrategy {
        match self {
            CaptureError::DeviceDisconnected(_) => RecoveryStrategy::Retry {
                attempts: 3,
                delay: Duration::from_secs(1),
            },
            CaptureError::SessionStartFailed(_) => RecoveryStrategy::Retry {
                attempts: 2,
                delay: Duration::from_millis(500),
            },
            CaptureError::BufferOverflow | CaptureError::BufferUnderrun => {
                RecoveryStrategy::Ignore
            }
            _ => RecoveryStrategy::Fail,
        }
    }
}

/// Standard result alias used throughout the capture pipeline.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// A detailed, loggable report about an error occurrence.
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub session_id: Option<uuid::Uuid>,
    pub additional_info: Vec<(String, String)>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            session_id: None,
            additional_info: Vec::new(),
        }
    }

    pub fn with_session(mut self, id: uuid::Uuid) -> Self {
        self.session_id = Some(id);
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_info.push((key.into(), value.into()));
        self
    }

    /// Render a multi-line report, matching the reference engine's diagnostic style.
    pub fn report(&self, error: &CaptureError) -> String {
        let mut out = format!(
            "Capture Error Report\n=====================\nOperation: {}\nError: {}",
            self.operation, error
        );
        if let Some(id) = self.session_id {
            out.push_str(&format!("\nSession ID: {id}"));
        }
        for (key, value) in &self.additional_info {
            out.push_str(&format!("\n  {key}: {value}"));
        }
        if let Some(suggestion) = error.recovery_suggestion() {
            out.push_str(&format!("\n\nRecovery Suggestion: {suggestion}"));
        }
        out
    }
}
