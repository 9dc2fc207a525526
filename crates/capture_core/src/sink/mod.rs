//! Sink Plug-in Interface & Fan-out Multiplexer
//!
//! A sink is a capability set, not a callback: adding a new sink type
//! never requires touching the producer. `configure` runs exactly once
//! before any `process`; `finish` runs exactly once and ends the sink's
//! lifecycle.

mod broadcast;
mod callback;
mod multiplexer;
mod queue_sink;
mod wav;

pub use broadcast::{BroadcastClient, BroadcastSink};
pub use callback::CallbackSink;
pub use multiplexer::Multiplexer;
pub use queue_sink::QueueSink;
pub use wav::WavSink;

use async_trait::async_trait;

use crate::buffer::AudioBuffer;
use crate::error::CaptureError;
use crate::format::AudioFormat;

/// A destination for converted audio buffers.
///
/// Lifecycle: `configure` once, then any number of `process` calls, then
/// `finish` once. Calls after `finish` are not made by the multiplexer.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn configure(&self, format: AudioFormat) -> Result<(), CaptureError>;

    async fn process(&self, buffer: &AudioBuffer) -> Result<(), CaptureError>;

    /// Notified when `process` fails; never propagates to other sinks.
    async fn handle_error(&self, error: &CaptureError);

    async fn finish(&self) -> Result<(), CaptureError>;
}
