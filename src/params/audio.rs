//! Audio capture and spectral analysis configuration.

use std::ops::Range;

use crate::error::ConfigError;

/// Spectral analysis configuration with frequency band mappings
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Capture sample rate (Hz)
    pub sample_rate_hz: u32,

    /// Samples per channel in one audio frame (also the FFT length)
    pub block_size: usize,

    /// Interleaved channels delivered by the source (1 or 2)
    pub channels: u16,

    /// Upper edge of the bass band (Hz, exclusive)
    pub bass_cutoff_hz: f32,

    /// Upper edge of the mid band (Hz, exclusive)
    pub mid_cutoff_hz: f32,

    /// Upper edge of the treble band (Hz, exclusive)
    pub treble_cutoff_hz: f32,

    /// Divisor applied to mean band magnitude before clamping to [0, 1].
    /// Tuned empirically for 44.1 kHz / 1024-sample blocks.
    pub band_scale: f32,

    /// Gain applied to the positive energy deviation to form the transient
    pub transient_gain: f32,

    /// Frames kept in each feature history
    pub history_capacity: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            block_size: 1024,
            channels: 2,
            bass_cutoff_hz: 250.0,
            mid_cutoff_hz: 2000.0,
            treble_cutoff_hz: 20000.0,
            band_scale: 5.0,
            transient_gain: 5.0,
            history_capacity: 60,
        }
    }
}

impl AnalysisConfig {
    /// Number of magnitude bins produced by a real-input FFT of `block_size`
    pub fn spectrum_len(&self) -> usize {
        self.block_size / 2 + 1
    }

    /// Centre frequency of FFT bin `k` (Hz)
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate_hz as f32 / self.block_size as f32
    }

    /// Bins whose frequency lies in `[low_hz, high_hz)`
    ///
    /// Bins are ordered by frequency, so the matching set is contiguous.
    /// An empty range is returned when no bin falls inside the band.
    pub fn band_bins(&self, low_hz: f32, high_hz: f32) -> Range<usize> {
        let mut matching =
            (0..self.spectrum_len()).filter(|&k| (low_hz..high_hz).contains(&self.bin_frequency(k)));
        match matching.next() {
            Some(start) => {
                let end = matching.last().unwrap_or(start) + 1;
                start..end
            }
            None => 0..0,
        }
    }

    /// FFT bin range for bass frequencies
    pub fn bass_bins(&self) -> Range<usize> {
        self.band_bins(0.0, self.bass_cutoff_hz)
    }

    /// FFT bin range for mid frequencies
    pub fn mid_bins(&self) -> Range<usize> {
        self.band_bins(self.bass_cutoff_hz, self.mid_cutoff_hz)
    }

    /// FFT bin range for treble frequencies
    pub fn treble_bins(&self) -> Range<usize> {
        self.band_bins(self.mid_cutoff_hz, self.treble_cutoff_hz)
    }

    /// Validate configuration (non-empty blocks, ordered cutoffs, etc.)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::Invalid("sample rate must be > 0".into()));
        }
        if self.block_size < 2 || self.block_size % 2 != 0 {
            return Err(ConfigError::Invalid(format!(
                "block size must be an even number >= 2, got {}",
                self.block_size
            )));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(ConfigError::Invalid(format!(
                "only mono or stereo input is supported, got {} channels",
                self.channels
            )));
        }
        if !(0.0 < self.bass_cutoff_hz
            && self.bass_cutoff_hz < self.mid_cutoff_hz
            && self.mid_cutoff_hz < self.treble_cutoff_hz)
        {
            return Err(ConfigError::Invalid(
                "band cutoffs must be positive and strictly increasing".into(),
            ));
        }
        if self.band_scale <= 0.0 {
            return Err(ConfigError::Invalid("band scale must be > 0".into()));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history capacity must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_frequency() {
        let config = AnalysisConfig::default();

        // At 44100 Hz sample rate and 1024 block size:
        // Bin resolution = 44100 / 1024 ≈ 43.07 Hz per bin
        assert_eq!(config.bin_frequency(0), 0.0);
        assert!((config.bin_frequency(1) - 43.066).abs() < 0.01);
        assert_eq!(config.spectrum_len(), 513);
    }

    #[test]
    fn test_band_ranges_partition_spectrum() {
        let config = AnalysisConfig::default();

        let bass = config.bass_bins();
        let mid = config.mid_bins();
        let treble = config.treble_bins();

        // 5 * 43.07 = 215 Hz < 250 Hz <= 6 * 43.07 = 258 Hz
        assert_eq!(bass, 0..6);
        assert_eq!(mid.start, bass.end);
        assert_eq!(treble.start, mid.end);
        assert!(config.bin_frequency(treble.end - 1) < 20000.0);
        assert!(config.bin_frequency(treble.end) >= 20000.0);
    }

    #[test]
    fn test_band_without_bins_is_empty() {
        let config = AnalysisConfig {
            sample_rate_hz: 8000,
            block_size: 16,
            ..AnalysisConfig::default()
        };

        // 500 Hz per bin: a 10-20 Hz band falls between bins 0 and 1
        assert!(config.band_bins(10.0, 20.0).is_empty());
    }

    #[test]
    fn test_validate() {
        assert!(AnalysisConfig::default().validate().is_ok());

        let odd = AnalysisConfig {
            block_size: 1023,
            ..AnalysisConfig::default()
        };
        assert!(odd.validate().is_err());

        let surround = AnalysisConfig {
            channels: 6,
            ..AnalysisConfig::default()
        };
        assert!(surround.validate().is_err());
    }
}
