//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::audio::SourceKind;
use crate::error::ConfigError;
use crate::params::{AnalysisConfig, ExportConfig, ParticleParams, RenderConfig};
use crate::pipeline::{ControlFlags, PipelineConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Vibescope")]
#[command(about = "Audio-reactive layered visualizer", long_about = None)]
pub struct Args {
    /// Audio source: auto, noise, sine:<HZ> or wav:<PATH>
    #[arg(long, value_name = "SOURCE", default_value = "auto")]
    pub source: String,

    /// Preferred capture device (substring of its name)
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,

    /// Seed for particles, fractal chaos and event randomness
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Window / frame width (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "1024")]
    pub width: u32,

    /// Window / frame height (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "768")]
    pub height: u32,

    /// Target frame rate
    #[arg(long, default_value = "60")]
    pub fps: u32,

    /// Particle pool size
    #[arg(long, value_name = "COUNT", default_value = "200")]
    pub particles: usize,

    /// Divisor applied to mean band magnitudes
    #[arg(long, value_name = "SCALE", default_value = "5.0")]
    pub band_scale: f32,

    /// Gain applied to positive energy deviation
    #[arg(long, value_name = "GAIN", default_value = "5.0")]
    pub transient_gain: f32,

    /// Frames kept in each feature history
    #[arg(long, value_name = "FRAMES", default_value = "60")]
    pub history: usize,

    /// Start with the kaleidoscope off
    #[arg(long)]
    pub calm: bool,

    /// Start with warp and tunnel off
    #[arg(long)]
    pub no_extra: bool,

    /// Start with the info line hidden
    #[arg(long)]
    pub no_info: bool,

    /// Render this many frames without a window, then exit
    #[arg(long, value_name = "COUNT")]
    pub frames: Option<usize>,

    /// Output directory for headless frames
    #[arg(long, value_name = "DIR", default_value = "frames")]
    pub output: PathBuf,
}

impl Args {
    /// Parse the audio source selection
    pub fn parse_source(&self) -> Result<SourceKind, ConfigError> {
        let kind: SourceKind = self.source.parse()?;
        match &kind {
            SourceKind::Auto => println!("Audio: live capture (noise if no device)"),
            SourceKind::Noise => println!("Audio: white noise"),
            SourceKind::Sine(hz) => println!("Audio: {}Hz sine", hz),
            SourceKind::Wav(path) => println!("Audio: {}", path.display()),
        }
        Ok(kind)
    }

    /// Build and validate the pipeline configuration
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        let analysis = AnalysisConfig {
            band_scale: self.band_scale,
            transient_gain: self.transient_gain,
            history_capacity: self.history,
            ..AnalysisConfig::default()
        };
        analysis.validate()?;

        Ok(PipelineConfig {
            analysis,
            particles: ParticleParams {
                count: self.particles,
                ..ParticleParams::default()
            },
            seed: self.seed,
            ..PipelineConfig::default()
        })
    }

    /// Build and validate the window configuration
    pub fn render_config(&self) -> Result<RenderConfig, ConfigError> {
        let config = RenderConfig {
            window_width: self.width,
            window_height: self.height,
            target_fps: self.fps,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create export configuration if headless mode is enabled
    pub fn export_config(&self) -> Option<ExportConfig> {
        self.frames
            .map(|frames| ExportConfig::new(frames, self.output.clone()))
    }

    /// Initial mode toggles
    pub fn control_flags(&self) -> ControlFlags {
        ControlFlags {
            paused: false,
            crazy: !self.calm,
            extra_crazy: !self.no_extra,
            show_info: !self.no_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["vibescope"]).unwrap();
        assert_eq!(args.parse_source().unwrap(), SourceKind::Auto);
        assert!(args.export_config().is_none());

        let flags = args.control_flags();
        assert!(flags.crazy && flags.extra_crazy && flags.show_info);
        assert!(!flags.paused);

        let render = args.render_config().unwrap();
        assert_eq!((render.window_width, render.window_height), (1024, 768));
        assert_eq!(render.target_fps, 60);

        let config = args.pipeline_config().unwrap();
        assert_eq!(config.particles.count, 200);
        assert_eq!(config.analysis.history_capacity, 60);
    }

    #[test]
    fn test_headless_options() {
        let args = Args::try_parse_from([
            "vibescope",
            "--source",
            "sine:100",
            "--frames",
            "30",
            "--output",
            "out",
            "--particles",
            "10",
            "--seed",
            "9",
            "--calm",
        ])
        .unwrap();

        assert_eq!(args.parse_source().unwrap(), SourceKind::Sine(100.0));
        let export = args.export_config().unwrap();
        assert_eq!(export.frames, 30);
        assert_eq!(export.output_dir, PathBuf::from("out"));

        let config = args.pipeline_config().unwrap();
        assert_eq!(config.particles.count, 10);
        assert_eq!(config.seed, 9);
        assert!(!args.control_flags().crazy);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let args = Args::try_parse_from(["vibescope", "--source", "mic"]).unwrap();
        assert!(args.parse_source().is_err());

        let args = Args::try_parse_from(["vibescope", "--history", "0"]).unwrap();
        assert!(args.pipeline_config().is_err());

        let args = Args::try_parse_from(["vibescope", "--fps", "0"]).unwrap();
        assert!(args.render_config().is_err());

        assert!(Args::try_parse_from(["vibescope", "--width", "-5"]).is_err());
    }
}
