//! Spectral feature extraction.
//!
//! A Hann-windowed FFT of each mono block is reduced to three normalized
//! bands, a composite energy and a transient, with bounded history.

mod fft;
mod history;

// Re-export public types
pub use fft::{hann_window, SpectralAnalyzer};
pub use history::{FeatureHistory, History};

/// Audio features for one frame, read-only for every generator
///
/// `bass`, `mid`, `treble` and `energy` are in [0, 1] and
/// `energy == (bass + mid + treble) / 3`; `transient` is >= 0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FeatureSnapshot {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub energy: f32,
    pub transient: f32,
}

impl FeatureSnapshot {
    /// Band level for a round-robin index (0 = bass, 1 = mid, 2 = treble)
    pub fn band(&self, index: usize) -> f32 {
        match index % 3 {
            0 => self.bass,
            1 => self.mid,
            _ => self.treble,
        }
    }
}
