//! Audio capture and signal conditioning.
//!
//! Sources deliver fixed-size blocks of interleaved signed 16-bit PCM.
//! The conditioner turns a block into normalized mono samples for analysis.

mod conditioner;
mod synthetic;
mod system;
mod wav;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::{info, warn};
use rand::Rng;

use crate::error::{CaptureError, ConfigError};
use crate::params::AnalysisConfig;

// Re-export public types
pub use conditioner::to_mono;
pub use synthetic::{synthetic_noise_frame, NoiseSource, SineSource};
pub use system::CpalSource;
pub use wav::WavSource;

/// Sample rate and channel layout of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate_hz: u32,
    pub channels: u16,
}

/// One block of interleaved PCM samples, immutable once captured
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Vec<i16>,
    channels: u16,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, channels: u16) -> Self {
        Self {
            samples,
            channels: channels.max(1),
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Anything that can deliver the next audio block
pub trait FrameSource {
    /// Format of the frames this source produces
    fn format(&self) -> StreamFormat;

    /// Next block, `Ok(None)` when no block arrived within one frame budget
    fn next_frame(&mut self) -> Result<Option<AudioFrame>, CaptureError>;

    /// Reopen the underlying device, falling back to a default where one exists
    fn reopen(&mut self) -> Result<(), CaptureError>;
}

/// Result of one capture attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// Frame delivered by the source
    Captured(AudioFrame),
    /// Source failed twice; synthetic noise of the same shape
    Substituted(AudioFrame),
    /// Nothing arrived in time; caller reuses the previous snapshot
    Missing,
}

impl Capture {
    pub fn frame(&self) -> Option<&AudioFrame> {
        match self {
            Self::Captured(frame) | Self::Substituted(frame) => Some(frame),
            Self::Missing => None,
        }
    }
}

/// Capture the next frame, recovering from source failures
///
/// On error the source is reopened once and read again. If that also fails
/// (or yields nothing), a noise frame of `block_size` samples per channel is
/// substituted so downstream stages always receive a valid frame.
pub fn capture<S, R>(source: &mut S, block_size: usize, rng: &mut R) -> Capture
where
    S: FrameSource + ?Sized,
    R: Rng + ?Sized,
{
    let err = match source.next_frame() {
        Ok(Some(frame)) => return Capture::Captured(frame),
        Ok(None) => return Capture::Missing,
        Err(e) => e,
    };

    warn!("Audio capture failed: {}. Trying to reconnect...", err);

    let retried = source.reopen().and_then(|_| source.next_frame());
    match retried {
        Ok(Some(frame)) => Capture::Captured(frame),
        Ok(None) => {
            warn!("Reconnected source has no data yet, using noise for this frame");
            let channels = source.format().channels;
            Capture::Substituted(synthetic_noise_frame(block_size, channels, rng))
        }
        Err(e) => {
            warn!("Failed to reconnect ({}), using noise for this frame", e);
            let channels = source.format().channels;
            Capture::Substituted(synthetic_noise_frame(block_size, channels, rng))
        }
    }
}

/// Where audio comes from
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// Live capture device, falling back to noise when none opens
    Auto,
    Noise,
    /// Sine tone at the given frequency (Hz)
    Sine(f32),
    /// Looping WAV file
    Wav(PathBuf),
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ConfigError::UnknownSource(s.to_string());
        match s.split_once(':') {
            None => match s.to_lowercase().as_str() {
                "auto" => Ok(Self::Auto),
                "noise" => Ok(Self::Noise),
                _ => Err(unknown()),
            },
            Some((kind, arg)) => match kind.to_lowercase().as_str() {
                "sine" => match arg.parse::<f32>() {
                    Ok(hz) if hz > 0.0 && hz.is_finite() => Ok(Self::Sine(hz)),
                    _ => Err(unknown()),
                },
                "wav" if !arg.is_empty() => Ok(Self::Wav(PathBuf::from(arg))),
                _ => Err(unknown()),
            },
        }
    }
}

/// Open the source described by `kind`
///
/// Synthetic sources use the format in `config`. `Auto` never fails: when no
/// capture device can be opened it logs a warning and plays seeded noise.
/// `wait` bounds how long a live source blocks per frame.
pub fn open_source(
    kind: &SourceKind,
    device: Option<&str>,
    config: &AnalysisConfig,
    wait: Duration,
    seed: u64,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    let format = StreamFormat {
        sample_rate_hz: config.sample_rate_hz,
        channels: config.channels,
    };

    let source: Box<dyn FrameSource> = match kind {
        SourceKind::Auto => match CpalSource::open(device, config.block_size, wait) {
            Ok(source) => Box::new(source),
            Err(e) => {
                warn!("No capture device ({}), falling back to noise", e);
                Box::new(NoiseSource::new(format, config.block_size, seed))
            }
        },
        SourceKind::Noise => Box::new(NoiseSource::new(format, config.block_size, seed)),
        SourceKind::Sine(hz) => Box::new(SineSource::new(format, config.block_size, *hz, 0.5)),
        SourceKind::Wav(path) => Box::new(WavSource::open(path, config.block_size)?),
    };

    info!(
        "Source: {:?} @ {}Hz, {} channel(s)",
        kind,
        source.format().sample_rate_hz,
        source.format().channels
    );
    Ok(source)
}
