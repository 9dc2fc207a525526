//! Capture Core - Real-Time Audio Capture Engine
//!
//! This crate provides the core capture pipeline:
//! - Audio format negotiation and conversion orchestration
//! - Bounded queues between the real-time producer and cooperative sinks
//! - Session lifecycle management and multi-sink fan-out
//! - A platform-agnostic `DeviceHandle` capability consumed from outside
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Control Thread                         │
//! │   Kit ──commands──▶ CaptureSession ◀──statistics── sinks    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ crossbeam-channel
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Real-Time Audio Thread                   │
//! │  DeviceHandle ──▶ Producer ──try_enqueue──▶ bounded queue   │
//! │              (Tier 1, non-blocking, non-allocating)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Cooperative Worker Pool (tokio)             │
//! │   ConvertingCollector ──▶ Multiplexer ──▶ {Wav, Broadcast,   │
//! │              (Tier 2, may allocate/await)     Queue, Callback} Sinks
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod buffer;
mod collector;
mod config;
mod device;
mod error;
mod format;
mod kit;
mod mixer;
mod producer;
mod queue;
mod session;
mod sink;

pub use buffer::{AudioBuffer, SampleLayout};
pub use collector::ConvertingCollector;
pub use config::{EngineConfig, StreamConfig};
pub use device::{DeviceHandle, DeviceOpener, RawBuffer, SharedDeviceOpener};
pub use error::{CaptureError, CaptureResult, ErrorContext, RecoveryStrategy};
pub use format::{AudioFormat, FormatNegotiator, FormatPreferences, FormatPriority};
pub use kit::Kit;
pub use mixer::MixingCoordinator;
pub use producer::Producer;
pub use queue::{FifoQueue, Priority, PriorityQueue, QueueStatistics, RingQueue};
pub use session::{CaptureSession, SessionObserver, SessionState, SessionStatistics};
pub use sink::{BroadcastClient, BroadcastSink, CallbackSink, Multiplexer, QueueSink, Sink, WavSink};
