//! Ring-Buffer Queue Sink
//!
//! Delivers converted buffers into a [`RingQueue`] for a consumer that
//! wants to pull audio at its own pace instead of being called back.

use async_trait::async_trait;

use super::Sink;
use crate::buffer::AudioBuffer;
use crate::error::CaptureError;
use crate::format::AudioFormat;
use crate::queue::RingQueue;

pub struct QueueSink {
    queue: std::sync::Arc<RingQueue<AudioBuffer>>,
}

impl QueueSink {
    pub fn new(queue: std::sync::Arc<RingQueue<AudioBuffer>>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl Sink for QueueSink {
    async fn configure(&self, _format: AudioFormat) -> Result<(), CaptureError> {
        Ok(())
    }

    async fn process(&self, buffer: &AudioBuffer) -> Result<(), CaptureError> {
        if !self.queue.try_enqueue(buffer.clone()) {
            return Err(CaptureError::BufferOverflow);
        }
        Ok(())
    }

    async fn handle_error(&self, error: &CaptureError) {
        tracing::warn!(error = %error, "queue sink processing error");
    }

    async fn finish(&self) -> Result<(), CaptureError> {
        Ok(())
    }
}
