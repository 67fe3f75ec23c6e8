//! Frame sinks: where finished frames go.

use std::fs;

use log::{debug, info};

use crate::canvas::Layer;
use crate::error::SinkError;
use crate::params::ExportConfig;

/// Destination for finished frames, called once per composited frame
pub trait FrameSink {
    fn present(&mut self, frame: &Layer) -> Result<(), SinkError>;
}

/// Writes numbered PNGs (`frame_00000.png`, ...) into a directory
pub struct PngSequenceSink {
    config: ExportConfig,
    written: usize,
}

impl PngSequenceSink {
    /// Create the output directory if needed
    pub fn new(config: ExportConfig) -> Result<Self, SinkError> {
        fs::create_dir_all(&config.output_dir)?;
        info!("Writing frames to {}", config.output_dir.display());
        Ok(Self { config, written: 0 })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameSink for PngSequenceSink {
    fn present(&mut self, frame: &Layer) -> Result<(), SinkError> {
        let path = self.config.frame_path(self.written);
        image::save_buffer(
            &path,
            &frame.to_rgba8(),
            frame.width(),
            frame.height(),
            image::ColorType::Rgba8,
        )?;
        debug!("Saved {}", path.display());
        self.written += 1;
        Ok(())
    }
}
