//! WAV File Sink
//!
//! Writes a linear `Unconfigured -> Configured -> Writing -> Closed` state
//! machine onto a `hound::WavWriter`. File I/O is serialized behind a
//! mutex and offloaded to the blocking-I/O executor so a sink may be
//! driven from multiple worker tasks without blocking them.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, error};

use super::Sink;
use crate::buffer::AudioBuffer;
use crate::error::CaptureError;
use crate::format::AudioFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Unconfigured,
    Writing,
    Closed,
    Failed,
}

struct WavState {
    status: Status,
    writer: Option<WavWriter<BufWriter<File>>>,
    format: Option<AudioFormat>,
    total_frames: u64,
}

/// Writes arriving buffers to a RIFF/WAVE file at `path`.
pub struct WavSink {
    path: PathBuf,
    state: std::sync::Arc<Mutex<WavState>>,
}

impl WavSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: std::sync::Arc::new(Mutex::new(WavState {
                status: Status::Unconfigured,
                writer: None,
                format: None,
                total_frames: 0,
            })),
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.state.lock().unwrap().total_frames
    }
}

#[async_trait]
impl Sink for WavSink {
    async fn configure(&self, format: AudioFormat) -> Result<(), CaptureError> {
        let path = self.path.clone();
        let state = std::sync::Arc::clone(&self.state);

        tokio::task::spawn_blocking(move || {
            let mut guard = state.lock().unwrap();
            if guard.status != Status::Unconfigured {
                return Err(CaptureError::InvalidState(
                    "wav sink already configured".into(),
                ));
            }

            let spec = WavSpec {
                channels: format.channel_count,
                sample_rate: format.sample_rate as u32,
                bits_per_sample: format.bit_depth as u16,
                sample_format: if format.is_float {
                    SampleFormat::Float
                } else {
                    SampleFormat::Int
                },
            };

            let file = File::create(&path)
                .map_err(|e| CaptureError::FileWriteFailed(e.to_string()))?;
            let writer = WavWriter::new(BufWriter::new(file), spec)
                .map_err(|e| CaptureError::FileWriteFailed(e.to_string()))?;

            guard.writer = Some(writer);
            guard.format = Some(format);
            guard.status = Status::Writing;
            debug!(path = %path.display(), "wav sink configured");
            Ok(())
        })
        .await
        .map_err(|e| CaptureError::FileWriteFailed(e.to_string()))?
    }

    async fn process(&self, buffer: &AudioBuffer) -> Result<(), CaptureError> {
        let state = std::sync::Arc::clone(&self.state);
        let buffer = buffer.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = state.lock().unwrap();
            if guard.status != Status::Writing {
                return Err(CaptureError::InvalidState(
                    "wav sink is not in the writing state".into(),
                ));
            }
            let format = guard.format.expect("configured before writing");
            let interleaved = buffer.data.to_interleaved(format.channel_count as usize);
            let writer = guard.writer.as_mut().expect("configured before writing");

            let write_result = if format.is_float {
                interleaved
                    .iter()
                    .try_for_each(|s| writer.write_sample(*s))
            } else if format.bit_depth == 24 {
                interleaved
                    .iter()
                    .try_for_each(|s| writer.write_sample(capture_dsp::float_to_int24(*s)))
            } else {
                interleaved
                    .iter()
                    .try_for_each(|s| writer.write_sample(capture_dsp::float_to_int16(*s)))
            };

            match write_result {
                Ok(()) => {
                    guard.total_frames += buffer.frame_count as u64;
                    Ok(())
                }
                Err(e) => {
                    guard.status = Status::Failed;
                    Err(CaptureError::FileWriteFailed(e.to_string()))
                }
            }
        })
        .await
        .map_err(|e| CaptureError::FileWriteFailed(e.to_string()))?
    }

    async fn handle_error(&self, error: &CaptureError) {
        error!(error = %error, "wav sink processing error");
    }

    async fn finish(&self) -> Result<(), CaptureError> {
        let state = std::sync::Arc::clone(&self.state);

        tokio::task::spawn_blocking(move || {
            let mut guard = state.lock().unwrap();
            if guard.status != Status::Writing {
                return Ok(());
            }
            if let Some(writer) = guard.writer.take() {
                writer
                    .finalize()
                    .map_err(|e| CaptureError::FileWriteFailed(e.to_string()))?;
            }
            guard.status = Status::Closed;
            Ok(())
        })
        .await
        .map_err(|e| CaptureError::FileWriteFailed(e.to_string()))?
    }
}
