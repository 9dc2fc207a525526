//! Channel Mapping & Bit-Depth Conversion
//!
//! The other two steps of a buffer's conversion pipeline, alongside
//! resampling: remapping channel counts, and quantizing between float32
//! and the fixed-point depths a file or wire format may demand.

/// Maps `input` (one `Vec<f32>` per source channel, equal length) to
/// `target_channels` planes.
///
/// `stereo -> mono` averages per frame; `mono -> stereo` duplicates;
/// equal counts pass through unchanged; any other mismatch truncates
/// extra source channels or zero-pads missing ones.
pub fn map_channels(input: &[Vec<f32>], target_channels: u16) -> Vec<Vec<f32>> {
    let target_channels = target_channels as usize;
    let source_channels = input.len();
    let frames = input.first().map_or(0, Vec::len);

    if source_channels == target_channels {
        return input.to_vec();
    }

    if source_channels == 2 && target_channels == 1 {
        let mono: Vec<f32> = (0..frames)
            .map(|i| 0.5 * (input[0][i] + input[1][i]))
            .collect();
        return vec![mono];
    }

    if source_channels == 1 && target_channels == 2 {
        return vec![input[0].clone(), input[0].clone()];
    }

    (0..target_channels)
        .map(|ch| input.get(ch).cloned().unwrap_or_else(|| vec![0.0; frames]))
        .collect()
}

/// Converts a normalized `[-1.0, 1.0]` float sample to a signed 16-bit
/// integer, clamping first.
pub fn float_to_int16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Converts a signed 16-bit integer back to a normalized float.
pub fn int16_to_float(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Converts a normalized float sample to a signed 24-bit integer, stored
/// in the low three bytes of an `i32`, clamping first.
pub fn float_to_int24(sample: f32) -> i32 {
    (sample.clamp(-1.0, 1.0) * 8_388_607.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_to_mono_averages() {
        let stereo = vec![vec![1.0, 0.0], vec![-1.0, 0.0]];
        let mono = map_channels(&stereo, 1);
        assert_eq!(mono, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn mono_to_stereo_duplicates() {
        let mono = vec![vec![0.5, -0.5]];
        let stereo = map_channels(&mono, 2);
        assert_eq!(stereo, vec![vec![0.5, -0.5], vec![0.5, -0.5]]);
    }

    #[test]
    fn extra_channels_are_zero_padded() {
        let mono = vec![vec![0.3, 0.4]];
        let quad = map_channels(&mono, 4);
        assert_eq!(quad.len(), 4);
        assert_eq!(quad[0], vec![0.3, 0.4]);
        assert_eq!(quad[1], vec![0.0, 0.0]);
    }

    #[test]
    fn float_int16_round_trip_within_one_lsb() {
        let original = 0.25_f32;
        let packed = float_to_int16(original);
        let back = int16_to_float(packed);
        assert!((original - back).abs() < 1.0 / 32768.0);
    }

    #[test]
    fn float_to_int16_clamps() {
        assert_eq!(float_to_int16(2.0), 32767);
        assert_eq!(float_to_int16(-2.0), -32767);
    }
}
