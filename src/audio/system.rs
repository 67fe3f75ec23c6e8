//! Live audio capture through cpal.
//!
//! The cpal callback runs on its own thread: it converts samples to i16,
//! accumulates fixed-size blocks and pushes them into a bounded queue.
//! The render loop pulls from that queue with a one-frame timeout so a
//! stalled device never freezes rendering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{info, trace, warn};

use super::{AudioFrame, FrameSource, StreamFormat};
use crate::error::CaptureError;

/// Device names that usually expose the system output as an input
const LOOPBACK_HINTS: [&str; 5] = [
    "Stereo Mix",
    "What U Hear",
    "Wave Out Mix",
    "CABLE Output",
    "Monitor of",
];

/// Blocks buffered between the capture thread and the render loop
const QUEUE_DEPTH: usize = 4;

/// Capture system owning the input stream and the receiving end of its queue
pub struct CpalSource {
    /// Receiver for completed blocks
    frames: Receiver<AudioFrame>,

    /// Set by the stream error callback
    failed: Arc<AtomicBool>,

    /// Input stream (kept alive)
    _stream: cpal::Stream,

    format: StreamFormat,
    block_size: usize,
    wait: Duration,
    device_name: String,
}

impl CpalSource {
    /// Open the preferred device (substring match), a loopback device, or the default input
    ///
    /// `wait` bounds how long `next_frame` blocks before reporting a missing frame.
    pub fn open(
        preferred: Option<&str>,
        block_size: usize,
        wait: Duration,
    ) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = select_device(&host, preferred)?;
        Self::start(device, block_size, wait)
    }

    fn start(device: cpal::Device, block_size: usize, wait: Duration) -> Result<Self, CaptureError> {
        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceConfig(e.to_string()))?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let device_channels = config.channels() as usize;
        let format = StreamFormat {
            sample_rate_hz: config.sample_rate().0,
            channels: config.channels().min(2),
        };

        info!(
            "Audio: {} @ {}Hz ({} device channels, capturing {})",
            device_name, format.sample_rate_hz, device_channels, format.channels
        );

        let (sender, frames) = bounded(QUEUE_DEPTH);
        let failed = Arc::new(AtomicBool::new(false));
        let accumulator = BlockAccumulator::new(sender, block_size, device_channels, format.channels);

        let stream_config: cpal::StreamConfig = config.clone().into();
        let stream = match config.sample_format() {
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, accumulator, Arc::clone(&failed))
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, accumulator, Arc::clone(&failed))
            }
            cpal::SampleFormat::I32 => {
                build_stream::<i32>(&device, &stream_config, accumulator, Arc::clone(&failed))
            }
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, accumulator, Arc::clone(&failed))
            }
            other => {
                return Err(CaptureError::UnsupportedFormat(format!(
                    "sample format {:?}",
                    other
                )))
            }
        }?;

        stream
            .play()
            .map_err(|e| CaptureError::BuildStream(e.to_string()))?;

        Ok(Self {
            frames,
            failed,
            _stream: stream,
            format,
            block_size,
            wait,
            device_name,
        })
    }
}

impl FrameSource for CpalSource {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn next_frame(&mut self) -> Result<Option<AudioFrame>, CaptureError> {
        if self.failed.load(Ordering::Acquire) {
            return Err(CaptureError::Stream(format!(
                "device '{}' reported an error",
                self.device_name
            )));
        }

        newest_block(&self.frames, self.wait)
    }

    /// Reopen on the host's default input device
    fn reopen(&mut self) -> Result<(), CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)?;
        *self = Self::start(device, self.block_size, self.wait)?;
        Ok(())
    }
}

/// Wait up to `wait` for a block, then skip ahead to the newest one queued
///
/// Older blocks are dropped so the visuals never trail the audio by more
/// than one block when rendering falls behind capture.
fn newest_block(
    frames: &Receiver<AudioFrame>,
    wait: Duration,
) -> Result<Option<AudioFrame>, CaptureError> {
    let mut frame = match frames.recv_timeout(wait) {
        Ok(frame) => frame,
        Err(RecvTimeoutError::Timeout) => return Ok(None),
        Err(RecvTimeoutError::Disconnected) => return Err(CaptureError::Disconnected),
    };

    let mut skipped = 0;
    while let Ok(newer) = frames.try_recv() {
        frame = newer;
        skipped += 1;
    }
    if skipped > 0 {
        trace!("Skipped {} stale capture block(s)", skipped);
    }
    Ok(Some(frame))
}

/// Pick the input device: explicit preference, then loopback hints, then default
fn select_device(host: &cpal::Host, preferred: Option<&str>) -> Result<cpal::Device, CaptureError> {
    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map(|iter| iter.collect())
        .unwrap_or_default();
    let names: Vec<String> = devices
        .iter()
        .map(|d| d.name().unwrap_or_default())
        .collect();

    let chosen = match preferred {
        Some(wanted) => {
            let index = find_device(&names, &[wanted]);
            if index.is_none() {
                warn!("No input device matches '{}', falling back", wanted);
            }
            index.or_else(|| find_device(&names, &LOOPBACK_HINTS))
        }
        None => find_device(&names, &LOOPBACK_HINTS),
    };

    match chosen {
        Some(index) => devices
            .into_iter()
            .nth(index)
            .ok_or(CaptureError::NoInputDevice),
        None => {
            warn!("No system audio capture device found, using the default input device");
            host.default_input_device()
                .ok_or(CaptureError::NoInputDevice)
        }
    }
}

/// Index of the first device whose name contains any of `hints`
fn find_device(names: &[String], hints: &[&str]) -> Option<usize> {
    names
        .iter()
        .position(|name| hints.iter().any(|hint| name.contains(hint)))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut accumulator: BlockAccumulator,
    failed: Arc<AtomicBool>,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                accumulator.push_interleaved(data.iter().map(|&s| i16::from_sample(s)));
            },
            move |err| {
                warn!("Audio stream error: {}", err);
                failed.store(true, Ordering::Release);
            },
            None,
        )
        .map_err(|e| CaptureError::BuildStream(e.to_string()))
}

/// Groups device samples into fixed-size blocks for the render loop
struct BlockAccumulator {
    sender: Sender<AudioFrame>,
    block_size: usize,
    device_channels: usize,
    kept_channels: u16,
    pending: Vec<i16>,
    column: usize,
}

impl BlockAccumulator {
    fn new(
        sender: Sender<AudioFrame>,
        block_size: usize,
        device_channels: usize,
        kept_channels: u16,
    ) -> Self {
        Self {
            sender,
            block_size,
            device_channels: device_channels.max(1),
            kept_channels,
            pending: Vec::with_capacity(block_size * kept_channels as usize),
            column: 0,
        }
    }

    /// Append interleaved device samples, keeping the first `kept_channels` of each frame
    fn push_interleaved(&mut self, samples: impl Iterator<Item = i16>) {
        let block_len = self.block_size * self.kept_channels as usize;

        for sample in samples {
            if self.column < self.kept_channels as usize {
                self.pending.push(sample);
            }
            self.column = (self.column + 1) % self.device_channels;

            if self.pending.len() == block_len {
                let block = std::mem::replace(&mut self.pending, Vec::with_capacity(block_len));
                let frame = AudioFrame::new(block, self.kept_channels);
                match self.sender.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => trace!("Capture queue full, dropping block"),
                    Err(TrySendError::Disconnected(_)) => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_device_prefers_first_hint_match() {
        let names = vec![
            "Microphone (USB)".to_string(),
            "Stereo Mix (Realtek)".to_string(),
            "Monitor of Built-in Audio".to_string(),
        ];

        assert_eq!(find_device(&names, &LOOPBACK_HINTS), Some(1));
        assert_eq!(find_device(&names, &["USB"]), Some(0));
        assert_eq!(find_device(&names, &["Bluetooth"]), None);
    }

    #[test]
    fn test_accumulator_emits_fixed_blocks() {
        let (sender, receiver) = bounded(8);
        let mut acc = BlockAccumulator::new(sender, 2, 2, 2);

        acc.push_interleaved([1, 2, 3].into_iter());
        assert!(receiver.try_recv().is_err());

        acc.push_interleaved([4, 5, 6].into_iter());
        let frame = receiver.try_recv().unwrap();
        assert_eq!(frame.samples(), &[1, 2, 3, 4]);
        assert_eq!(frame.channels(), 2);
    }

    #[test]
    fn test_accumulator_drops_extra_channels() {
        let (sender, receiver) = bounded(8);
        // Four device channels, keep two
        let mut acc = BlockAccumulator::new(sender, 2, 4, 2);

        acc.push_interleaved([1, 2, 90, 91, 3, 4, 92, 93].into_iter());
        let frame = receiver.try_recv().unwrap();
        assert_eq!(frame.samples(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_accumulator_drops_blocks_when_queue_full() {
        let (sender, receiver) = bounded(1);
        let mut acc = BlockAccumulator::new(sender, 1, 1, 1);

        acc.push_interleaved([7, 8, 9].into_iter());
        assert_eq!(receiver.len(), 1);
        assert_eq!(receiver.try_recv().unwrap().samples(), &[7]);
    }

    #[test]
    fn test_newest_block_skips_stale_blocks() {
        let (sender, receiver) = bounded(QUEUE_DEPTH);
        for value in 1..=3 {
            sender.try_send(AudioFrame::new(vec![value], 1)).unwrap();
        }

        let frame = newest_block(&receiver, Duration::from_millis(10)).unwrap();
        assert_eq!(frame.map(|f| f.samples().to_vec()), Some(vec![3]));
        assert!(receiver.is_empty());
    }

    #[test]
    fn test_newest_block_times_out_and_disconnects() {
        let (sender, receiver) = bounded::<AudioFrame>(QUEUE_DEPTH);
        assert!(matches!(
            newest_block(&receiver, Duration::from_millis(5)),
            Ok(None)
        ));

        drop(sender);
        assert!(matches!(
            newest_block(&receiver, Duration::from_millis(5)),
            Err(CaptureError::Disconnected)
        ));
    }
}
