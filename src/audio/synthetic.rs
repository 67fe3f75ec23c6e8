//! Synthetic sources: fallback noise and deterministic test tones.

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{AudioFrame, FrameSource, StreamFormat};
use crate::error::CaptureError;

/// Full-range uniform noise with the same shape as a captured block
pub fn synthetic_noise_frame<R: Rng + ?Sized>(
    block_size: usize,
    channels: u16,
    rng: &mut R,
) -> AudioFrame {
    let samples = (0..block_size * channels as usize)
        .map(|_| rng.gen_range(i16::MIN..=i16::MAX))
        .collect();
    AudioFrame::new(samples, channels)
}

/// Continuous sine tone written identically to every channel
pub struct SineSource {
    format: StreamFormat,
    block_size: usize,
    frequency_hz: f32,
    /// Peak amplitude as a fraction of full scale
    amplitude: f32,
    phase: f32,
}

impl SineSource {
    pub fn new(format: StreamFormat, block_size: usize, frequency_hz: f32, amplitude: f32) -> Self {
        Self {
            format,
            block_size,
            frequency_hz,
            amplitude: amplitude.clamp(0.0, 1.0),
            phase: 0.0,
        }
    }
}

impl FrameSource for SineSource {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn next_frame(&mut self) -> Result<Option<AudioFrame>, CaptureError> {
        let step = TAU * self.frequency_hz / self.format.sample_rate_hz as f32;
        let channels = self.format.channels as usize;
        let mut samples = Vec::with_capacity(self.block_size * channels);

        for _ in 0..self.block_size {
            let value = (self.phase.sin() * self.amplitude * i16::MAX as f32) as i16;
            samples.extend(std::iter::repeat(value).take(channels));
            self.phase = (self.phase + step) % TAU;
        }

        Ok(Some(AudioFrame::new(samples, self.format.channels)))
    }

    fn reopen(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }
}

/// Seeded white noise source
pub struct NoiseSource {
    format: StreamFormat,
    block_size: usize,
    rng: StdRng,
}

impl NoiseSource {
    pub fn new(format: StreamFormat, block_size: usize, seed: u64) -> Self {
        Self {
            format,
            block_size,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl FrameSource for NoiseSource {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn next_frame(&mut self) -> Result<Option<AudioFrame>, CaptureError> {
        Ok(Some(synthetic_noise_frame(
            self.block_size,
            self.format.channels,
            &mut self.rng,
        )))
    }

    fn reopen(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }
}
