//! Mixing Coordinator
//!
//! Drives two independent producers + collectors toward a single target
//! format (default 48 kHz stereo non-interleaved float32) and produces a
//! linear mix of the two once both have stopped.
//!
//! Time alignment is by buffer-arrival order, not timestamp: correct only
//! when both sources start close together.

use crate::collector::ConvertingCollector;
use crate::format::AudioFormat;

/// 0.5/0.5 linear mix of two collectors' converted streams.
pub struct MixingCoordinator {
    target_format: AudioFormat,
    max_buffers: usize,
    input: Option<ConvertingCollector>,
    output: Option<ConvertingCollector>,
}

impl MixingCoordinator {
    /// `max_buffers` bounds how many converted buffers each side's collector
    /// retains before dropping the oldest, per `EngineConfig::max_buffers`.
    pub fn new(target_format: AudioFormat, max_buffers: usize) -> Self {
        Self {
            target_format,
            max_buffers,
            input: None,
            output: None,
        }
    }

    /// Lazily instantiates the input-side collector on first use, using
    /// the shape/rate of the first buffer to pin down the source format.
    pub fn input_collector(&mut self, source_format: AudioFormat) -> &mut ConvertingCollector {
        let max_buffers = self.max_buffers;
        self.input
            .get_or_insert_with(|| ConvertingCollector::new(source_format, self.target_format, max_buffers))
    }

    pub fn output_collector(&mut self, source_format: AudioFormat) -> &mut ConvertingCollector {
        let max_buffers = self.max_buffers;
        self.output
            .get_or_insert_with(|| ConvertingCollector::new(source_format, self.target_format, max_buffers))
    }

    /// Produces the mixed `(channels, frames)` array after both producers
    /// have stopped. Falls back to unmixed passthrough if only one source
    /// ever emitted a buffer.
    pub fn mix(&self) -> Vec<Vec<f32>> {
        match (&self.input, &self.output) {
            (Some(input), Some(output)) => {
                let input_planar = input.concatenated_planar();
                let output_planar = output.concatenated_planar();
                mix_planar(&output_planar, &input_planar)
            }
            (Some(input), None) => input.concatenated_planar(),
            (None, Some(output)) => output.concatenated_planar(),
            (None, None) => Vec::new(),
        }
    }
}

/// `mixed[ch][i] = 0.5*output[ch][i] + 0.5*input[ch][i]`, with `input`
/// zero-padded past its own end. Shaped after `output`.
fn mix_planar(output: &[Vec<f32>], input: &[Vec<f32>]) -> Vec<Vec<f32>> {
    output
        .iter()
        .enumerate()
        .map(|(ch, out_plane)| {
            let in_plane = input.get(ch);
            out_plane
                .iter()
                .enumerate()
                .map(|(i, &out_sample)| {
                    let in_sample = in_plane.and_then(|plane| plane.get(i)).copied().unwrap_or(0.0);
                    0.5 * out_sample + 0.5 * in_sample
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{AudioBuffer, SampleLayout};
    use std::time::Instant;

    fn mono_buffer(samples: Vec<f32>, format: AudioFormat) -> AudioBuffer {
        AudioBuffer::new(SampleLayout::Interleaved(samples), format, Instant::now())
    }

    #[test]
    fn mixes_two_equal_length_sources_at_half_gain() {
        let format = AudioFormat::new(48000.0, 1, 32, true, false);
        let mut coordinator = MixingCoordinator::new(format, 64);
        coordinator.input_collector(format).add(&mono_buffer(vec![1.0, 1.0], format));
        coordinator.output_collector(format).add(&mono_buffer(vec![1.0, 1.0], format));

        let mixed = coordinator.mix();
        assert_eq!(mixed, vec![vec![1.0, 1.0]]);
    }

    #[test]
    fn zero_pads_the_shorter_input_past_its_end() {
        let format = AudioFormat::new(48000.0, 1, 32, true, false);
        let mut coordinator = MixingCoordinator::new(format, 64);
        coordinator.input_collector(format).add(&mono_buffer(vec![1.0], format));
        coordinator
            .output_collector(format)
            .add(&mono_buffer(vec![1.0, 1.0, 1.0], format));

        let mixed = coordinator.mix();
        assert_eq!(mixed, vec![vec![1.0, 0.5, 0.5]]);
    }

    #[test]
    fn single_source_passes_through_unmixed() {
        let format = AudioFormat::new(48000.0, 1, 32, true, false);
        let mut coordinator = MixingCoordinator::new(format, 64);
        coordinator.output_collector(format).add(&mono_buffer(vec![0.25, 0.5], format));

        let mixed = coordinator.mix();
        assert_eq!(mixed, vec![vec![0.25, 0.5]]);
    }

    #[test]
    fn no_sources_yields_empty_mix() {
        let coordinator = MixingCoordinator::new(AudioFormat::default_format(), 64);
        assert!(coordinator.mix().is_empty());
    }
}
