//! Producer Adapter
//!
//! Wraps a `DeviceHandle` callback: tags each native buffer with a
//! timestamp and hands it off to the multiplexer with a non-blocking,
//! non-allocating try-enqueue. This is the only code that runs on the
//! real-time audio thread (Tier 1); everything downstream runs on the
//! cooperative worker pool (Tier 2).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::buffer::{AudioBuffer, SampleLayout};
use crate::device::{DeviceHandle, RawBuffer};
use crate::format::AudioFormat;
use crate::queue::FifoQueue;

/// Bridges an opened [`DeviceHandle`] to a bounded hand-off queue.
///
/// Construction registers the device callback immediately; dropping or
/// calling [`Producer::stop`] is idempotent.
pub struct Producer {
    device: Box<dyn DeviceHandle>,
    format: AudioFormat,
    recording: Arc<AtomicBool>,
    queue: Arc<FifoQueue<AudioBuffer>>,
}

impl Producer {
    /// Opens the device's callback onto `queue`. The device must not have
    /// had a callback registered yet.
    pub fn start(mut device: Box<dyn DeviceHandle>, queue: Arc<FifoQueue<AudioBuffer>>) -> Self {
        let format = device.actual_format();
        let recording = Arc::new(AtomicBool::new(true));

        let cb_recording = Arc::clone(&recording);
        let cb_queue = Arc::clone(&queue);
        let cb_format = format;

        device.register_callback(Box::new(move |raw: RawBuffer| {
            if !cb_recording.load(Ordering::Relaxed) {
                return;
            }
            let buffer = AudioBuffer::new(
                SampleLayout::Interleaved(raw.samples),
                cb_format,
                Instant::now(),
            );
            let _ = cb_queue.try_enqueue(buffer);
        }));

        Self {
            device,
            format,
            recording,
            queue,
        }
    }

    pub fn actual_sample_rate(&self) -> f64 {
        self.format.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.format.channel_count
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    pub fn queue(&self) -> &Arc<FifoQueue<AudioBuffer>> {
        &self.queue
    }

    /// Stops delivering buffers and closes the device. Safe to call more
    /// than once.
    pub fn stop(&mut self) {
        if self.recording.swap(false, Ordering::Relaxed) {
            self.device.close();
        }
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::test_support::ScriptedDevice;

    #[test]
    fn delivers_buffers_into_the_queue() {
        let format = AudioFormat::default_format();
        let (device, state) = ScriptedDevice::new_pair(format);
        let queue = Arc::new(FifoQueue::new(8));

        let producer = Producer::start(device, Arc::clone(&queue));
        state.emit(RawBuffer {
            samples: vec![0.0; 4],
            frame_count: 2,
        });

        assert_eq!(queue.count(), 1);
        assert!(producer.is_recording());
        assert_eq!(producer.channel_count(), format.channel_count);
    }

    #[test]
    fn stop_is_idempotent_and_halts_delivery() {
        let format = AudioFormat::default_format();
        let (device, state) = ScriptedDevice::new_pair(format);
        let queue = Arc::new(FifoQueue::new(8));

        let mut producer = Producer::start(device, Arc::clone(&queue));
        producer.stop();
        producer.stop();
        state.emit(RawBuffer {
            samples: vec![0.0; 4],
            frame_count: 2,
        });

        assert!(!producer.is_recording());
        assert_eq!(queue.count(), 0);
    }
}
