//! Fan-out Multiplexer
//!
//! Dispatches each buffer to every attached sink concurrently. A sink's
//! failure is isolated to that sink: its `handle_error` is invoked, it
//! stays attached, and every other sink still receives the buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;

use super::Sink;
use crate::buffer::AudioBuffer;
use crate::error::CaptureError;
use crate::format::AudioFormat;

/// Holds an ordered set of sinks and fans buffers out to all of them.
pub struct Multiplexer {
    sinks: Mutex<Vec<Arc<dyn Sink>>>,
    paused: AtomicBool,
}

impl Multiplexer {
    pub fn new() -> Self {
        Self {
            sinks: Mutex::new(Vec::new()),
            paused: AtomicBool::new(false),
        }
    }

    pub async fn attach(&self, sink: Arc<dyn Sink>, format: AudioFormat) -> Result<(), CaptureError> {
        sink.configure(format).await?;
        self.sinks.lock().await.push(sink);
        Ok(())
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Dispatches `buffer` to every sink concurrently, awaiting all of
    /// them. A paused multiplexer drops the buffer on the floor.
    pub async fn dispatch(&self, buffer: &AudioBuffer) {
        if self.paused.load(Ordering::Relaxed) {
            return;
        }

        let snapshot: Vec<Arc<dyn Sink>> = self.sinks.lock().await.clone();
        let dispatches = snapshot.iter().map(|sink| async move {
            if let Err(err) = sink.process(buffer).await {
                sink.handle_error(&err).await;
            }
        });
        join_all(dispatches).await;
    }

    /// Calls `finish()` on every attached sink exactly once, in
    /// attach-order, then drops them all.
    pub async fn finish_all(&self) {
        let mut sinks = self.sinks.lock().await;
        for sink in sinks.iter() {
            if let Err(err) = sink.finish().await {
                sink.handle_error(&err).await;
            }
        }
        sinks.clear();
    }

    pub async fn sink_count(&self) -> usize {
        self.sinks.lock().await.len()
    }
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new()
    }
}
