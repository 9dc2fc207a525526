//! Converting Collector
//!
//! Brings each arriving buffer into a common target format, one buffer at
//! a time, never re-resampling the whole history at the end.

use std::time::Instant;

use tracing::warn;

use crate::buffer::{AudioBuffer, SampleLayout};
use crate::format::AudioFormat;

/// Streams buffers of `input_format` into a contiguous store of
/// `target_format` buffers, applying channel mapping, resampling, and
/// layout conversion per arriving buffer.
pub struct ConvertingCollector {
    input_format: AudioFormat,
    target_format: AudioFormat,
    max_buffers: usize,
    converted: Vec<AudioBuffer>,
    cached_total_frames: usize,
    total_buffers_added: u64,
    total_frames_converted: u64,
    conversion_errors: u64,
}

impl ConvertingCollector {
    pub fn new(input_format: AudioFormat, target_format: AudioFormat, max_buffers: usize) -> Self {
        Self {
            input_format,
            target_format,
            max_buffers,
            converted: Vec::new(),
            cached_total_frames: 0,
            total_buffers_added: 0,
            total_frames_converted: 0,
            conversion_errors: 0,
        }
    }

    pub fn with_default_target(input_format: AudioFormat, max_buffers: usize) -> Self {
        Self::new(input_format, AudioFormat::default_format(), max_buffers)
    }

    /// Converts and appends one buffer. A per-buffer failure is recorded
    /// and the buffer dropped; this never returns an error to the caller.
    pub fn add(&mut self, buffer: &AudioBuffer) {
        self.total_buffers_added += 1;

        if buffer.format.channel_count == 0 || buffer.frame_count == 0 {
            warn!(frames = buffer.frame_count, "skipping empty capture buffer");
            self.conversion_errors += 1;
            return;
        }

        let planar = buffer.data.to_planar(buffer.format.channel_count as usize);
        let mapped = capture_dsp::map_channels(&planar, self.target_format.channel_count);

        let resampled: Vec<Vec<f32>> = if (buffer.format.sample_rate
            - self.target_format.sample_rate)
            .abs()
            / self.target_format.sample_rate
            > 1e-3
        {
            capture_dsp::resample_planar(&mapped, buffer.format.sample_rate, self.target_format.sample_rate)
        } else {
            mapped
        };

        let frame_count = resampled.first().map_or(0, Vec::len);
        let data = if self.target_format.is_interleaved {
            SampleLayout::Interleaved(
                SampleLayout::Planar(resampled).to_interleaved(self.target_format.channel_count as usize),
            )
        } else {
            SampleLayout::Planar(resampled)
        };

        let converted = AudioBuffer {
            data,
            format: self.target_format,
            timestamp: buffer.timestamp,
            frame_count,
        };

        self.cached_total_frames += converted.frame_count;
        self.total_frames_converted += converted.frame_count as u64;
        self.converted.push(converted);

        if self.converted.len() > self.max_buffers {
            let dropped = self.converted.remove(0);
            self.cached_total_frames -= dropped.frame_count;
        }
    }

    pub fn input_format(&self) -> AudioFormat {
        self.input_format
    }

    pub fn target_format(&self) -> AudioFormat {
        self.target_format
    }

    pub fn buffers(&self) -> &[AudioBuffer] {
        &self.converted
    }

    pub fn total_frames(&self) -> usize {
        self.cached_total_frames
    }

    pub fn duration_secs(&self) -> f64 {
        self.cached_total_frames as f64 / self.target_format.sample_rate
    }

    pub fn total_buffers_added(&self) -> u64 {
        self.total_buffers_added
    }

    pub fn total_frames_converted(&self) -> u64 {
        self.total_frames_converted
    }

    pub fn conversion_errors(&self) -> u64 {
        self.conversion_errors
    }

    /// Concatenates every stored buffer's planar samples into one
    /// `(channels, frames)` array, used by the mixing coordinator.
    pub fn concatenated_planar(&self) -> Vec<Vec<f32>> {
        let channels = self.target_format.channel_count as usize;
        let mut out = vec![Vec::with_capacity(self.cached_total_frames); channels];
        for buffer in &self.converted {
            let planar = buffer.data.to_planar(channels);
            for (ch, plane) in planar.into_iter().enumerate() {
                out[ch].extend(plane);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(samples: Vec<f32>, format: AudioFormat) -> AudioBuffer {
        AudioBuffer::new(SampleLayout::Interleaved(samples), format, Instant::now())
    }

    #[test]
    fn identity_format_passes_through_unchanged() {
        let format = AudioFormat::default_format();
        let mut collector = ConvertingCollector::new(format, format, 16);
        collector.add(&buffer(vec![0.1, 0.2, 0.3, 0.4], format));
        assert_eq!(collector.total_frames(), 2);
        assert_eq!(collector.total_buffers_added(), 1);
    }

    #[test]
    fn resamples_44100_to_48000() {
        let input_format = AudioFormat::new(44100.0, 1, 32, true, true);
        let target = AudioFormat::new(48000.0, 1, 32, true, false);
        let mut collector = ConvertingCollector::new(input_format, target, 16);
        collector.add(&buffer(vec![0.0; 44100], input_format));
        assert!((collector.total_frames() as i64 - 48000).abs() <= 1);
        assert!((collector.duration_secs() - 1.0).abs() < 21e-6 * 4.0);
    }

    #[test]
    fn stereo_input_to_mono_target_averages() {
        let input_format = AudioFormat::new(48000.0, 2, 32, true, true);
        let target = AudioFormat::new(48000.0, 1, 32, true, false);
        let mut collector = ConvertingCollector::new(input_format, target, 16);
        collector.add(&buffer(vec![1.0, -1.0, 1.0, -1.0], input_format));
        let planar = collector.concatenated_planar();
        assert_eq!(planar, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn empty_buffer_increments_conversion_errors() {
        let format = AudioFormat::default_format();
        let mut collector = ConvertingCollector::new(format, format, 16);
        collector.add(&buffer(vec![], format));
        assert_eq!(collector.conversion_errors(), 1);
        assert_eq!(collector.total_frames(), 0);
    }

    #[test]
    fn overflow_drops_oldest_buffer() {
        let format = AudioFormat::default_format();
        let mut collector = ConvertingCollector::new(format, format, 2);
        for _ in 0..3 {
            collector.add(&buffer(vec![0.0; 4], format));
        }
        assert_eq!(collector.buffers().len(), 2);
        assert_eq!(collector.total_frames(), 4);
    }
}
