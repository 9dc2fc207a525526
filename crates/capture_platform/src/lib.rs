//! Capture Platform - cpal-backed Device Adapter
//!
//! The only crate in this workspace allowed to reach for a concrete audio
//! backend. It enumerates input devices and implements
//! `capture_core::device::DeviceHandle` over `cpal`, so the core pipeline
//! never has to know an OS audio API exists.

mod error;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use capture_core::{AudioFormat, CaptureError, CaptureResult, DeviceHandle, DeviceOpener, RawBuffer};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

pub use error::PlatformError;

impl From<PlatformError> for CaptureError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NoDevicesFound => CaptureError::DeviceNotFound("default input".into()),
            PlatformError::DeviceNotFound(name) => CaptureError::DeviceNotFound(name),
            PlatformError::StreamBuildError(msg) => CaptureError::SessionStartFailed(msg),
            PlatformError::StreamPlayError(msg) => CaptureError::SessionStartFailed(msg),
            PlatformError::UnsupportedConfig(msg) => CaptureError::UnsupportedFormat(msg),
        }
    }
}

/// A discoverable input device, independent of any open stream.
#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub max_channels: u16,
}

/// Lists the host's available input devices.
pub fn enumerate_input_devices() -> Result<Vec<InputDeviceInfo>, PlatformError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| PlatformError::DeviceNotFound(e.to_string()))?;

    let mut out = Vec::new();
    for device in devices {
        let Ok(name) = device.name() else { continue };
        let max_channels = device
            .supported_input_configs()
            .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(2))
            .unwrap_or(2);
        let is_default = default_name.as_deref() == Some(name.as_str());
        out.push(InputDeviceInfo {
            name,
            is_default,
            max_channels,
        });
    }

    if out.is_empty() {
        return Err(PlatformError::NoDevicesFound);
    }
    Ok(out)
}

/// A `DeviceHandle` backed by a live `cpal` input stream.
///
/// The stream is not started until [`register_callback`](DeviceHandle::register_callback)
/// is called; the real-time callback itself performs no allocation, matching
/// the non-blocking discipline the rest of the pipeline expects from Tier 1.
pub struct CpalDeviceHandle {
    device: cpal::Device,
    config: cpal::StreamConfig,
    format: AudioFormat,
    stream: Option<cpal::Stream>,
    closed: Arc<AtomicBool>,
}

impl CpalDeviceHandle {
    fn new(device: cpal::Device, config: cpal::StreamConfig, format: AudioFormat) -> Self {
        Self {
            device,
            config,
            format,
            stream: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl DeviceHandle for CpalDeviceHandle {
    fn actual_format(&self) -> AudioFormat {
        self.format
    }

    fn register_callback(&mut self, mut callback: Box<dyn FnMut(RawBuffer) + Send>) {
        let closed = Arc::clone(&self.closed);
        let channels = self.config.channels.max(1) as usize;

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if closed.load(Ordering::Relaxed) {
                        return;
                    }
                    callback(RawBuffer {
                        samples: data.to_vec(),
                        frame_count: data.len() / channels,
                    });
                },
                |err| {
                    tracing::error!(error = %err, "cpal input stream error");
                },
                None,
            )
            .expect("building a cpal input stream with a previously negotiated config");

        if let Err(err) = stream.play() {
            tracing::error!(error = %err, "failed to start cpal input stream");
        }
        self.stream = Some(stream);
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
        self.stream = None;
    }
}

/// A [`DeviceOpener`] that opens the host's default input device through `cpal`,
/// negotiating the closest supported configuration to `requested`.
pub struct CpalDeviceOpener;

impl DeviceOpener for CpalDeviceOpener {
    fn open(&self, requested: AudioFormat) -> CaptureResult<Box<dyn DeviceHandle>> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(PlatformError::NoDevicesFound)?;

        let supported = device
            .default_input_config()
            .map_err(|e| PlatformError::UnsupportedConfig(e.to_string()))?;

        let config = cpal::StreamConfig {
            channels: requested.channel_count.min(supported.channels()),
            sample_rate: cpal::SampleRate(requested.sample_rate as u32),
            buffer_size: cpal::BufferSize::Default,
        };

        let actual_format = AudioFormat::new(
            config.sample_rate.0 as f64,
            config.channels,
            32,
            true,
            true,
        );

        Ok(Box::new(CpalDeviceHandle::new(device, config, actual_format)))
    }
}
