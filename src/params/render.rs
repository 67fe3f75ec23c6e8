//! Rendering and frame export configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Target presentation rate (frames per second)
    pub target_fps: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1024,
            window_height: 768,
            target_fps: 60,
        }
    }
}

impl RenderConfig {
    /// Fixed frame interval enforced by the frame clock
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window_width, self.window_height
            )));
        }
        if self.target_fps == 0 {
            return Err(ConfigError::Invalid("target fps must be > 0".into()));
        }
        Ok(())
    }
}

/// Headless export configuration
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Frames to render before stopping
    pub frames: usize,

    /// Directory receiving numbered PNG frames
    pub output_dir: PathBuf,
}

impl ExportConfig {
    pub fn new(frames: usize, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            frames,
            output_dir: output_dir.into(),
        }
    }

    /// Path of frame `index`
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("frame_{:05}.png", index))
    }
}
