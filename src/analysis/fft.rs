//! Windowed FFT analysis and band extraction.

use std::f32::consts::PI;
use std::ops::Range;
use std::sync::Arc;

use log::debug;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::{FeatureHistory, FeatureSnapshot};
use crate::params::AnalysisConfig;

/// Spectral analyzer: the only writer of feature history
pub struct SpectralAnalyzer {
    config: AnalysisConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    bass_bins: Range<usize>,
    mid_bins: Range<usize>,
    treble_bins: Range<usize>,
    history: FeatureHistory,
}

impl SpectralAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let n = config.block_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        let bass_bins = config.bass_bins();
        let mid_bins = config.mid_bins();
        let treble_bins = config.treble_bins();

        debug!(
            "SpectralAnalyzer: block={} rate={}Hz bass={:?} mid={:?} treble={:?}",
            n, config.sample_rate_hz, bass_bins, mid_bins, treble_bins
        );

        Self {
            window: (0..n).map(|i| hann_window(i, n)).collect(),
            buffer: vec![Complex::new(0.0, 0.0); n],
            scratch,
            history: FeatureHistory::new(config.history_capacity),
            fft,
            bass_bins,
            mid_bins,
            treble_bins,
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn history(&self) -> &FeatureHistory {
        &self.history
    }

    /// Most recent magnitude spectrum, if any frame was analyzed
    pub fn latest_spectrum(&self) -> Option<&[f32]> {
        self.history.spectrum.latest().map(Vec::as_slice)
    }

    /// Drop all history (the next frame reports zero transient)
    pub fn reset(&mut self) {
        self.history = FeatureHistory::new(self.config.history_capacity);
    }

    /// Analyze one block of mono samples and record it in history
    ///
    /// Blocks shorter than the configured size are zero-padded, longer ones truncated.
    pub fn analyze(&mut self, mono: &[f32]) -> FeatureSnapshot {
        let spectrum = self.magnitude_spectrum(mono);

        let scale = self.config.band_scale;
        let bass = normalize(band_mean(&spectrum, &self.bass_bins), scale);
        let mid = normalize(band_mean(&spectrum, &self.mid_bins), scale);
        let treble = normalize(band_mean(&spectrum, &self.treble_bins), scale);
        let energy = (bass + mid + treble) / 3.0;

        // Compare against history before this frame is pushed
        let transient = match self.history.energy.mean() {
            Some(mean) => (energy - mean).max(0.0) * self.config.transient_gain,
            None => 0.0,
        };

        let mut waveform = mono.to_vec();
        waveform.resize(self.config.block_size, 0.0);

        self.history.spectrum.push(spectrum);
        self.history.waveform.push(waveform);
        self.history.bass.push(bass);
        self.history.mid.push(mid);
        self.history.treble.push(treble);
        self.history.energy.push(energy);
        self.history.transient.push(transient);

        FeatureSnapshot {
            bass,
            mid,
            treble,
            energy,
            transient,
        }
    }

    /// Hann-windowed FFT magnitudes for bins `0..=N/2`
    fn magnitude_spectrum(&mut self, mono: &[f32]) -> Vec<f32> {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = mono.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        self.buffer[..self.config.spectrum_len()]
            .iter()
            .map(|c| c.norm())
            .collect()
    }
}

/// Mean magnitude over `bins`, 0 when the band holds no bins
fn band_mean(spectrum: &[f32], bins: &Range<usize>) -> f32 {
    let end = bins.end.min(spectrum.len());
    let start = bins.start.min(end);
    if start == end {
        return 0.0;
    }
    spectrum[start..end].iter().sum::<f32>() / (end - start) as f32
}

fn normalize(value: f32, scale: f32) -> f32 {
    (value / scale).clamp(0.0, 1.0)
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    if size < 2 {
        return 1.0;
    }
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}
