//! Error types shared across the capture, render and presentation paths.

use thiserror::Error;

/// Audio capture failures
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no audio input device available")]
    NoInputDevice,

    #[error("failed to query input config: {0}")]
    DeviceConfig(String),

    #[error("failed to build input stream: {0}")]
    BuildStream(String),

    #[error("input stream error: {0}")]
    Stream(String),

    #[error("capture queue disconnected")]
    Disconnected,

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Invalid configuration values
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("unknown audio source '{0}' (expected auto, noise, sine:<hz> or wav:<path>)")]
    UnknownSource(String),
}

/// Layer buffer allocation failures
#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("cannot allocate a {width}x{height} layer")]
    Allocation { width: u32, height: u32 },
}

/// Failures while handing a finished frame to its destination
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Unrecoverable display setup failures
#[derive(Error, Debug)]
pub enum PresentError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to find a suitable GPU adapter")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface does not support any texture format")]
    NoSurfaceFormat,
}
