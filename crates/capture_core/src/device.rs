//! Device Handle Capability
//!
//! Device enumeration and OS audio backends are external collaborators.
//! The pipeline only ever consumes the opaque capability below; a concrete
//! implementation over `cpal` lives in the `capture_platform` crate and is
//! exercised by its own hardware-gated tests, never by this crate's.

use std::sync::Arc;

use crate::error::CaptureResult;
use crate::format::AudioFormat;

/// A raw block of samples as delivered by the platform's native callback,
/// before the producer tags it with a timestamp.
#[derive(Debug, Clone)]
pub struct RawBuffer {
    pub samples: Vec<f32>,
    pub frame_count: usize,
}

/// The capability an opened audio device exposes: its negotiated format
/// and a way to register the callback that receives native buffers.
///
/// `register_callback` is expected to be called exactly once, immediately
/// after `open`; implementations may assume a single registration.
pub trait DeviceHandle: Send {
    fn actual_format(&self) -> AudioFormat;

    fn register_callback(&mut self, callback: Box<dyn FnMut(RawBuffer) + Send>);

    fn close(&mut self);
}

/// Opens a device, yielding a [`DeviceHandle`] bound to the actual
/// negotiated format (which may differ from `requested`).
pub trait DeviceOpener: Send + Sync {
    fn open(&self, requested: AudioFormat) -> CaptureResult<Box<dyn DeviceHandle>>;
}

pub type SharedDeviceOpener = Arc<dyn DeviceOpener>;

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Shared state behind a [`ScriptedDevice`], kept separately so tests
    /// can drive the device after it has been boxed and moved.
    #[derive(Default)]
    pub struct ScriptedState {
        callback: Mutex<Option<Box<dyn FnMut(RawBuffer) + Send>>>,
        pub closed: Mutex<bool>,
    }

    impl ScriptedState {
        pub fn emit(&self, buffer: RawBuffer) {
            if let Some(cb) = self.callback.lock().unwrap().as_mut() {
                cb(buffer);
            }
        }
    }

    /// A `DeviceHandle` that replays buffers to whichever callback gets
    /// registered, used across this crate's unit tests in place of a
    /// hardware-backed device.
    pub struct ScriptedDevice {
        format: AudioFormat,
        state: Arc<ScriptedState>,
    }

    impl ScriptedDevice {
        /// Builds a boxed device plus a handle tests can use to emit
        /// buffers and inspect close state after the box is moved.
        pub fn new_pair(format: AudioFormat) -> (Box<dyn DeviceHandle>, Arc<ScriptedState>) {
            let state = Arc::new(ScriptedState::default());
            let device = Box::new(Self {
                format,
                state: Arc::clone(&state),
            });
            (device, state)
        }
    }

    impl DeviceHandle for ScriptedDevice {
        fn actual_format(&self) -> AudioFormat {
            self.format
        }

        fn register_callback(&mut self, callback: Box<dyn FnMut(RawBuffer) + Send>) {
            *self.state.callback.lock().unwrap() = Some(callback);
        }

        fn close(&mut self) {
            *self.state.closed.lock().unwrap() = true;
        }
    }

    #[test]
    fn scripted_device_delivers_to_registered_callback() {
        let (mut device, state) = ScriptedDevice::new_pair(AudioFormat::default_format());
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);

        device.register_callback(Box::new(move |buf: RawBuffer| {
            received_clone.lock().unwrap().push(buf.frame_count);
        }));
        state.emit(RawBuffer {
            samples: vec![0.0; 8],
            frame_count: 4,
        });

        assert_eq!(*received.lock().unwrap(), vec![4]);
    }

    #[test]
    fn close_marks_device_closed() {
        let (mut device, state) = ScriptedDevice::new_pair(AudioFormat::default_format());
        device.close();
        assert!(*state.closed.lock().unwrap());
    }
}
