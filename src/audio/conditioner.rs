//! Raw PCM to normalized mono conversion.

use super::AudioFrame;

/// Full-scale magnitude of signed 16-bit samples
const FULL_SCALE: f32 = 32768.0;

/// Convert an interleaved frame into mono samples in [-1, 1]
///
/// Each sample is divided by the full-scale magnitude, then channels are
/// averaged at every time index.
pub fn to_mono(frame: &AudioFrame) -> Vec<f32> {
    let channels = frame.channels() as usize;
    frame
        .samples()
        .chunks_exact(channels)
        .map(|group| {
            group.iter().map(|&s| s as f32 / FULL_SCALE).sum::<f32>() / channels as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_average() {
        let frame = AudioFrame::new(vec![16384, 0, -32768, -32768, 32767, -32767], 2);
        let mono = to_mono(&frame);

        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.25).abs() < 1e-6);
        assert!((mono[1] + 1.0).abs() < 1e-6);
        assert!(mono[2].abs() < 1e-6);
    }

    #[test]
    fn test_mono_passthrough() {
        let frame = AudioFrame::new(vec![-16384, 8192], 1);
        let mono = to_mono(&frame);

        assert_eq!(mono, vec![-0.5, 0.25]);
    }

    #[test]
    fn test_range_is_normalized() {
        let frame = AudioFrame::new(vec![i16::MIN, i16::MAX], 1);
        for sample in to_mono(&frame) {
            assert!((-1.0..=1.0).contains(&sample));
        }
    }
}
