//! Capture Session State Machine
//!
//! ```text
//! Idle ──start()──▶ Starting ──(producer ready)──▶ Active
//!                            └──(producer fails)──▶ Error
//! Active ─pause()─▶ Paused ─resume()─▶ Active
//! Active|Paused ─stop()─▶ Stopping ──▶ Stopped
//! (any) ─internal fault─▶ Error
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::device::{DeviceHandle, DeviceOpener};
use crate::error::{CaptureError, CaptureResult};
use crate::format::AudioFormat;
use crate::producer::Producer;
use crate::queue::FifoQueue;
use crate::sink::{Multiplexer, Sink};

/// A session's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Active,
    Paused,
    Stopping,
    Stopped,
    Error,
}

/// Monotonic counters kept for the lifetime of a session.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionStatistics {
    pub buffers_delivered: u64,
    pub underruns: u64,
    pub dropped_buffers: u64,
}

struct Inner {
    state: SessionState,
    producer: Option<Producer>,
}

/// Observes session state transitions, invoked outside the state lock.
pub trait SessionObserver: Send + Sync {
    fn on_state_changed(&self, session_id: Uuid, from: SessionState, to: SessionState);
}

/// Owns a producer and an ordered set of sinks, driving both through the
/// state machine above.
pub struct CaptureSession {
    pub id: Uuid,
    configured_format: AudioFormat,
    inner: Mutex<Inner>,
    multiplexer: Arc<Multiplexer>,
    observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
    buffers_delivered: AtomicU64,
}

impl CaptureSession {
    pub fn new(configured_format: AudioFormat) -> Self {
        Self {
            id: Uuid::new_v4(),
            configured_format,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                producer: None,
            }),
            multiplexer: Arc::new(Multiplexer::new()),
            observers: RwLock::new(Vec::new()),
            buffers_delivered: AtomicU64::new(0),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub fn format(&self) -> AudioFormat {
        self.configured_format
    }

    pub async fn add_observer(&self, observer: Arc<dyn SessionObserver>) {
        self.observers.write().await.push(observer);
    }

    async fn transition(&self, to: SessionState) {
        let from = {
            let mut guard = self.inner.lock().await;
            let from = guard.state;
            guard.state = to;
            from
        };
        if from != to {
            debug!(session = %self.id, ?from, ?to, "session state changed");
            for observer in self.observers.read().await.iter() {
                observer.on_state_changed(self.id, from, to);
            }
        }
    }

    /// Starts capture: opens `opener`, registers a producer against a
    /// fresh hand-off queue, and drains that queue into the multiplexer
    /// on the cooperative pool. Valid only from `Idle` or `Stopped`.
    pub async fn start(
        self: &Arc<Self>,
        opener: &dyn DeviceOpener,
        queue_capacity: usize,
    ) -> CaptureResult<()> {
        {
            let guard = self.inner.lock().await;
            if !matches!(guard.state, SessionState::Idle | SessionState::Stopped) {
                return Err(CaptureError::InvalidState(format!(
                    "cannot start from {:?}",
                    guard.state
                )));
            }
        }
        self.transition(SessionState::Starting).await;

        let device: Box<dyn DeviceHandle> = match opener.open(self.configured_format) {
            Ok(device) => device,
            Err(err) => {
                self.transition(SessionState::Error).await;
                return Err(err);
            }
        };

        let queue = Arc::new(FifoQueue::new(queue_capacity));
        let producer = Producer::start(device, Arc::clone(&queue));

        {
            let mut guard = self.inner.lock().await;
            guard.producer = Some(producer);
        }
        self.transition(SessionState::Active).await;

        let session = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let state = session.inner.lock().await.state;
                if matches!(state, SessionState::Stopping | SessionState::Stopped | SessionState::Error) {
                    break;
                }
                match queue.dequeue() {
                    Some(buffer) => {
                        session.multiplexer.dispatch(&buffer).await;
                        session.buffers_delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    None => tokio::time::sleep(std::time::Duration::from_millis(2)).await,
                }
            }
        });

        info!(session = %self.id, "capture session started");
        Ok(())
    }

    pub async fn pause(&self) -> CaptureResult<()> {
        let state = self.state().await;
        if state != SessionState::Active {
            return Err(CaptureError::InvalidState(format!(
                "cannot pause from {state:?}"
            )));
        }
        self.multiplexer.set_paused(true);
        self.transition(SessionState::Paused).await;
        Ok(())
    }

    pub async fn resume(&self) -> CaptureResult<()> {
        let state = self.state().await;
        if state != SessionState::Paused {
            return Err(CaptureError::InvalidState(format!(
                "cannot resume from {state:?}"
            )));
        }
        self.multiplexer.set_paused(false);
        self.transition(SessionState::Active).await;
        Ok(())
    }

    /// Attaches a sink, calling its `configure` then registering it with
    /// the multiplexer. Valid only in `Active` or `Paused`.
    pub async fn add_sink(&self, sink: Arc<dyn Sink>) -> CaptureResult<()> {
        let state = self.state().await;
        if !matches!(state, SessionState::Active | SessionState::Paused) {
            return Err(CaptureError::InvalidState(format!(
                "cannot add a sink from {state:?}"
            )));
        }
        self.multiplexer.attach(sink, self.configured_format).await
    }

    /// Drains the session: halts the producer, then calls `finish()` on
    /// every attached sink in attach-order exactly once.
    pub async fn stop(&self) -> CaptureResult<()> {
        let state = self.state().await;
        if !matches!(state, SessionState::Active | SessionState::Paused) {
            return Err(CaptureError::InvalidState(format!(
                "cannot stop from {state:?}"
            )));
        }
        self.transition(SessionState::Stopping).await;

        {
            let mut guard = self.inner.lock().await;
            if let Some(producer) = guard.producer.as_mut() {
                producer.stop();
            }
        }
        self.multiplexer.finish_all().await;
        self.transition(SessionState::Stopped).await;
        Ok(())
    }

    pub fn statistics(&self) -> SessionStatistics {
        SessionStatistics {
            buffers_delivered: self.buffers_delivered.load(Ordering::Relaxed),
            underruns: 0,
            dropped_buffers: 0,
        }
    }
}
