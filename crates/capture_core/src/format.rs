//! Audio Format Model & Negotiation
//!
//! Describes the layout of a PCM sample stream and the deterministic rules
//! for reconciling two formats into one.

use serde::{Deserialize, Serialize};

/// An immutable description of a PCM sample layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: f64,
    pub channel_count: u16,
    pub bit_depth: u8,
    pub is_float: bool,
    pub is_interleaved: bool,
}

impl AudioFormat {
    pub fn new(
        sample_rate: f64,
        channel_count: u16,
        bit_depth: u8,
        is_float: bool,
        is_interleaved: bool,
    ) -> Self {
        // 64-bit samples are always float; 32-bit int is valid, so only
        // the 64-bit case needs correcting.
        let is_float = is_float || bit_depth == 64;
        Self {
            sample_rate,
            channel_count,
            bit_depth,
            is_float,
            is_interleaved,
        }
    }

    /// Bytes occupied by one frame (all channels at one sample instant).
    pub fn bytes_per_frame(&self) -> usize {
        (self.bit_depth as usize / 8) * self.channel_count as usize
    }

    /// Bytes occupied by one packet (one frame for interleaved, one channel's
    /// sample otherwise).
    pub fn bytes_per_packet(&self) -> usize {
        let bytes_per_sample = self.bit_depth as usize / 8;
        if self.is_interleaved {
            bytes_per_sample * self.channel_count as usize
        } else {
            bytes_per_sample
        }
    }

    pub fn is_compatible(&self, other: &AudioFormat) -> bool {
        self == other
    }

    pub fn requires_conversion(&self, other: &AudioFormat) -> bool {
        !self.is_compatible(other)
    }

    /// 48 kHz, 2ch, float32, non-interleaved.
    pub fn default_format() -> Self {
        Self::new(48000.0, 2, 32, true, false)
    }

    /// 44.1 kHz, 2ch, int16, interleaved.
    pub fn cd_quality() -> Self {
        Self::new(44100.0, 2, 16, false, true)
    }

    /// 48 kHz, 2ch, int16, interleaved.
    pub fn standard_wav() -> Self {
        Self::new(48000.0, 2, 16, false, true)
    }

    /// 96 kHz, 2ch, int24, interleaved.
    pub fn high_quality() -> Self {
        Self::new(96000.0, 2, 24, false, true)
    }
}

/// Priority used when negotiating between a source and a destination format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatPriority {
    Quality,
    Compatibility,
    Performance,
    Balanced,
}

/// Preferences that bound a negotiated format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormatPreferences {
    pub priority: FormatPriority,
    pub max_sample_rate: Option<f64>,
    pub max_bit_depth: Option<u8>,
    pub prefer_interleaved: bool,
    pub prefer_float: bool,
}

impl Default for FormatPreferences {
    fn default() -> Self {
        Self {
            priority: FormatPriority::Balanced,
            max_sample_rate: None,
            max_bit_depth: None,
            prefer_interleaved: true,
            prefer_float: false,
        }
    }
}

impl FormatPreferences {
    pub fn high_quality() -> Self {
        Self {
            priority: FormatPriority::Quality,
            max_sample_rate: Some(192000.0),
            max_bit_depth: Some(32),
            prefer_interleaved: false,
            prefer_float: true,
        }
    }

    pub fn performance() -> Self {
        Self {
            priority: FormatPriority::Performance,
            max_sample_rate: Some(48000.0),
            max_bit_depth: Some(16),
            prefer_interleaved: true,
            prefer_float: false,
        }
    }
}

/// Finds a common format between a source and a destination, and scores
/// how expensive converting between two formats would be.
pub struct FormatNegotiator;

impl FormatNegotiator {
    /// Deterministic, pure negotiation — never touches I/O or randomness so
    /// that repeated calls on the same inputs are byte-for-byte identical.
    pub fn negotiate(
        source: AudioFormat,
        destination: AudioFormat,
        priority: FormatPriority,
    ) -> AudioFormat {
        if source.is_compatible(&destination) {
            return source;
        }

        match priority {
            FormatPriority::Quality => AudioFormat::new(
                source.sample_rate.max(destination.sample_rate),
                source.channel_count.max(destination.channel_count),
                source.bit_depth.max(destination.bit_depth),
                source.is_float || destination.is_float,
                destination.is_interleaved,
            ),
            FormatPriority::Compatibility => destination,
            FormatPriority::Performance => source,
            FormatPriority::Balanced => AudioFormat::new(
                destination.sample_rate,
                source.channel_count.min(destination.channel_count),
                destination.bit_depth,
                destination.is_float,
                destination.is_interleaved,
            ),
        }
    }

    /// Weighted conversion cost in `[0, 1]`: rate 0.3, channels 0.2,
    /// bit depth 0.2, float/int 0.2, interleaving 0.1.
    pub fn conversion_complexity(source: AudioFormat, destination: AudioFormat) -> f64 {
        let mut complexity: f64 = 0.0;
        if source.sample_rate != destination.sample_rate {
            complexity += 0.3;
        }
        if source.channel_count != destination.channel_count {
            complexity += 0.2;
        }
        if source.bit_depth != destination.bit_depth {
            complexity += 0.2;
        }
        if source.is_float != destination.is_float {
            complexity += 0.2;
        }
        if source.is_interleaved != destination.is_interleaved {
            complexity += 0.1;
        }
        complexity.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_frame_accounts_for_channels() {
        let f = AudioFormat::new(48000.0, 2, 32, true, false);
        assert_eq!(f.bytes_per_frame(), 8);
    }

    #[test]
    fn bit_depth_64_forces_float() {
        let f = AudioFormat::new(48000.0, 2, 64, false, true);
        assert!(f.is_float);
    }

    #[test]
    fn bit_depth_32_int_stays_int() {
        let f = AudioFormat::new(48000.0, 2, 32, false, true);
        assert!(!f.is_float);
    }

    #[test]
    fn negotiate_identity_returns_source_for_every_priority() {
        let a = AudioFormat::default_format();
        for p in [
            FormatPriority::Quality,
            FormatPriority::Compatibility,
            FormatPriority::Performance,
            FormatPriority::Balanced,
        ] {
            assert_eq!(FormatNegotiator::negotiate(a, a, p), a);
            assert_eq!(FormatNegotiator::conversion_complexity(a, a), 0.0);
        }
    }

    #[test]
    fn negotiate_quality_takes_field_wise_max() {
        let source = AudioFormat::new(44100.0, 1, 16, false, true);
        let dest = AudioFormat::new(48000.0, 2, 32, true, false);
        let negotiated = FormatNegotiator::negotiate(source, dest, FormatPriority::Quality);
        assert_eq!(negotiated.sample_rate, 48000.0);
        assert_eq!(negotiated.channel_count, 2);
        assert_eq!(negotiated.bit_depth, 32);
        assert!(negotiated.is_float);
        assert!(!negotiated.is_interleaved); // is_interleaved = dest
    }

    #[test]
    fn negotiate_compatibility_returns_dest() {
        let source = AudioFormat::cd_quality();
        let dest = AudioFormat::high_quality();
        assert_eq!(
            FormatNegotiator::negotiate(source, dest, FormatPriority::Compatibility),
            dest
        );
    }

    #[test]
    fn negotiate_performance_returns_source() {
        let source = AudioFormat::cd_quality();
        let dest = AudioFormat::high_quality();
        assert_eq!(
            FormatNegotiator::negotiate(source, dest, FormatPriority::Performance),
            source
        );
    }

    #[test]
    fn negotiate_balanced_takes_channel_min() {
        let source = AudioFormat::new(44100.0, 6, 16, false, true);
        let dest = AudioFormat::new(48000.0, 2, 24, false, true);
        let negotiated = FormatNegotiator::negotiate(source, dest, FormatPriority::Balanced);
        assert_eq!(negotiated.sample_rate, 48000.0);
        assert_eq!(negotiated.channel_count, 2);
        assert_eq!(negotiated.bit_depth, 24);
    }

    #[test]
    fn conversion_complexity_sums_weighted_diffs() {
        let source = AudioFormat::new(44100.0, 1, 16, false, true);
        let dest = AudioFormat::new(48000.0, 2, 32, true, false);
        let complexity = FormatNegotiator::conversion_complexity(source, dest);
        assert!((complexity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn serialization_round_trips() {
        let f = AudioFormat::high_quality();
        let json = serde_json::to_string(&f).unwrap();
        let back: AudioFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(f, back);
    }
}
