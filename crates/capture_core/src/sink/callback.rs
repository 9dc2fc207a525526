//! User Callback Sink
//!
//! Hands each converted buffer to a user-supplied closure, for callers
//! that want `stream_audio(handler)`-style delivery without standing up
//! a queue or a file.

use async_trait::async_trait;
use std::sync::Mutex;

use super::Sink;
use crate::buffer::AudioBuffer;
use crate::error::CaptureError;
use crate::format::AudioFormat;

pub struct CallbackSink {
    handler: Mutex<Box<dyn FnMut(&AudioBuffer) + Send>>,
}

impl CallbackSink {
    pub fn new(handler: impl FnMut(&AudioBuffer) + Send + 'static) -> Self {
        Self {
            handler: Mutex::new(Box::new(handler)),
        }
    }
}

#[async_trait]
impl Sink for CallbackSink {
    async fn configure(&self, _format: AudioFormat) -> Result<(), CaptureError> {
        Ok(())
    }

    async fn process(&self, buffer: &AudioBuffer) -> Result<(), CaptureError> {
        (self.handler.lock().unwrap())(buffer);
        Ok(())
    }

    async fn handle_error(&self, error: &CaptureError) {
        tracing::warn!(error = %error, "callback sink processing error");
    }

    async fn finish(&self) -> Result<(), CaptureError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SampleLayout;
    use std::sync::{atomic::AtomicUsize, atomic::Ordering, Arc};
    use std::time::Instant;

    #[tokio::test]
    async fn invokes_the_handler_once_per_buffer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let sink = CallbackSink::new(move |_buf| {
            calls_clone.fetch_add(1, Ordering::Relaxed);
        });

        let format = AudioFormat::default_format();
        let buffer = AudioBuffer::new(
            SampleLayout::Interleaved(vec![0.0; 4]),
            format,
            Instant::now(),
        );
        sink.process(&buffer).await.unwrap();
        sink.process(&buffer).await.unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }
}
