//! Looping WAV file source.

use std::path::Path;

use log::info;

use super::{AudioFrame, FrameSource, StreamFormat};
use crate::error::CaptureError;

/// Plays a decoded WAV file block by block, wrapping at the end
pub struct WavSource {
    format: StreamFormat,
    block_size: usize,
    samples: Vec<i16>,
    position: usize,
}

impl WavSource {
    /// Decode a mono or stereo WAV file (16-bit integer or 32-bit float)
    pub fn open(path: impl AsRef<Path>, block_size: usize) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        if !(1..=2).contains(&spec.channels) {
            return Err(CaptureError::UnsupportedFormat(format!(
                "{} channels (only mono or stereo)",
                spec.channels
            )));
        }

        let mut samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, bits) if bits <= 16 => {
                // Narrower integer samples come back unscaled; widen to full 16-bit range
                let shift = 16 - bits;
                reader
                    .into_samples::<i16>()
                    .map(|s| s.map(|v| v << shift))
                    .collect::<Result<_, _>>()?
            }
            (hound::SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<Result<_, _>>()?,
            (format, bits) => {
                return Err(CaptureError::UnsupportedFormat(format!(
                    "{:?} samples with {} bits",
                    format, bits
                )))
            }
        };

        // Drop a trailing partial frame so blocks stay channel-aligned when looping
        samples.truncate(samples.len() - samples.len() % spec.channels as usize);
        if samples.is_empty() {
            return Err(CaptureError::UnsupportedFormat("file contains no audio".into()));
        }

        info!(
            "Audio: {} @ {}Hz, {} channel(s), {} frames",
            path.display(),
            spec.sample_rate,
            spec.channels,
            samples.len() / spec.channels as usize
        );

        Ok(Self {
            format: StreamFormat {
                sample_rate_hz: spec.sample_rate,
                channels: spec.channels,
            },
            block_size,
            samples,
            position: 0,
        })
    }
}

impl FrameSource for WavSource {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn next_frame(&mut self) -> Result<Option<AudioFrame>, CaptureError> {
        let wanted = self.block_size * self.format.channels as usize;
        let mut block = Vec::with_capacity(wanted);

        while block.len() < wanted {
            let take = (wanted - block.len()).min(self.samples.len() - self.position);
            block.extend_from_slice(&self.samples[self.position..self.position + take]);
            self.position = (self.position + take) % self.samples.len();
        }

        Ok(Some(AudioFrame::new(block, self.format.channels)))
    }

    fn reopen(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }
}
