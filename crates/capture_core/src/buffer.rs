//! Audio Buffer & Sample Layout
//!
//! The source detects 1-D interleaved vs 2-D planar layout at runtime; here
//! it is a tagged variant so the shape invariant is enforced by the type
//! checker rather than by a length assertion scattered across call sites.

use std::time::Instant;

use crate::format::AudioFormat;

/// How samples for a buffer's frames are laid out in memory.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleLayout {
    /// `[L0, R0, L1, R1, ...]`
    Interleaved(Vec<f32>),
    /// One `Vec<f32>` per channel, each of length `frame_count`.
    Planar(Vec<Vec<f32>>),
}

impl SampleLayout {
    pub fn frame_count(&self, channel_count: usize) -> usize {
        match self {
            SampleLayout::Interleaved(samples) => {
                if channel_count == 0 {
                    0
                } else {
                    samples.len() / channel_count
                }
            }
            SampleLayout::Planar(channels) => channels.first().map_or(0, Vec::len),
        }
    }

    pub fn is_interleaved(&self) -> bool {
        matches!(self, SampleLayout::Interleaved(_))
    }

    /// Returns the interleaved form, copying only if this buffer is planar.
    pub fn to_interleaved(&self, channel_count: usize) -> Vec<f32> {
        match self {
            SampleLayout::Interleaved(samples) => samples.clone(),
            SampleLayout::Planar(channels) => {
                let frames = self.frame_count(channel_count);
                let mut out = vec![0.0f32; frames * channel_count];
                for (ch, plane) in channels.iter().enumerate() {
                    for (frame, sample) in plane.iter().enumerate() {
                        out[frame * channel_count + ch] = *sample;
                    }
                }
                out
            }
        }
    }

    /// Returns the planar form, copying only if this buffer is interleaved.
    pub fn to_planar(&self, channel_count: usize) -> Vec<Vec<f32>> {
        match self {
            SampleLayout::Planar(channels) => channels.clone(),
            SampleLayout::Interleaved(samples) => {
                let frames = self.frame_count(channel_count);
                let mut out = vec![Vec::with_capacity(frames); channel_count];
                for (i, sample) in samples.iter().enumerate() {
                    out[i % channel_count].push(*sample);
                }
                out
            }
        }
    }
}

/// A short-lived block of PCM audio, owned by the pipeline until every
/// attached sink has finished with it.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub data: SampleLayout,
    pub format: AudioFormat,
    pub timestamp: Instant,
    pub frame_count: usize,
}

impl AudioBuffer {
    pub fn new(data: SampleLayout, format: AudioFormat, timestamp: Instant) -> Self {
        let frame_count = data.frame_count(format.channel_count as usize);
        Self {
            data,
            format,
            timestamp,
            frame_count,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count as f64 / self.format.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_frame_count_divides_by_channels() {
        let layout = SampleLayout::Interleaved(vec![0.0; 8]);
        assert_eq!(layout.frame_count(2), 4);
    }

    #[test]
    fn planar_frame_count_is_longest_plane() {
        let layout = SampleLayout::Planar(vec![vec![0.0; 5], vec![0.0; 5]]);
        assert_eq!(layout.frame_count(2), 5);
    }

    #[test]
    fn interleaved_to_planar_round_trips() {
        let interleaved = SampleLayout::Interleaved(vec![1.0, 2.0, 3.0, 4.0]);
        let planar = interleaved.to_planar(2);
        assert_eq!(planar, vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
        let back = SampleLayout::Planar(planar).to_interleaved(2);
        assert_eq!(back, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn buffer_duration_uses_sample_rate() {
        let format = AudioFormat::new(48000.0, 2, 32, true, false);
        let buffer = AudioBuffer::new(
            SampleLayout::Interleaved(vec![0.0; 48000 * 2]),
            format,
            Instant::now(),
        );
        assert_eq!(buffer.frame_count, 48000);
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
    }
}
