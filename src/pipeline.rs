//! Per-frame pipeline: capture → analyze → update generators → composite.
//!
//! `PipelineState` owns everything that lives across frames: analyzer
//! history, the current snapshot, generator state, the compositor's layers,
//! the rotation/warp accumulators and the seeded random source.
//!
//! Lifecycle:
//! - `new` allocates layers at the initial size and spawns the particle pool
//! - `resize` reallocates layers at a new size, keeping all other state
//! - `reset` drops analyzer history and the accumulators (layers and particles stay)

use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec2;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::analysis::{FeatureSnapshot, SpectralAnalyzer};
use crate::audio::{capture, to_mono, Capture, FrameSource, StreamFormat};
use crate::canvas::Layer;
use crate::compositor::{Compositor, FrameContext, StageToggles};
use crate::error::{CanvasError, SinkError};
use crate::generators::{FractalTree, ParticleField, WaveformTracer};
use crate::params::{AnalysisConfig, CompositorParams, FractalParams, ParticleParams};
use crate::sink::FrameSink;

/// Control toggles, read once per frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlFlags {
    pub paused: bool,
    /// Kaleidoscope stage
    pub crazy: bool,
    /// Warp and tunnel stages
    pub extra_crazy: bool,
    pub show_info: bool,
}

/// Everything needed to build a pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub analysis: AnalysisConfig,
    pub particles: ParticleParams,
    pub fractal: FractalParams,
    pub compositor: CompositorParams,
    /// Seed for particle, fractal and event randomness
    pub seed: u64,
}

pub struct PipelineState {
    analyzer: SpectralAnalyzer,
    snapshot: FeatureSnapshot,
    particles: ParticleField,
    fractal: FractalTree,
    waveform: WaveformTracer,
    compositor: Compositor,
    toggles: StageToggles,
    rotation_angle: f32,
    warp_time: f32,
    frames: u64,
    rng: StdRng,
}

impl PipelineState {
    pub fn new(config: PipelineConfig, width: u32, height: u32) -> Result<Self, CanvasError> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let compositor = Compositor::new(width, height, config.compositor)?;
        let bounds = Vec2::new(width as f32, height as f32);
        let particles = ParticleField::new(config.particles, bounds, &mut rng);

        info!(
            "Pipeline: {}x{} canvas, {} particles, seed {}",
            width,
            height,
            particles.len(),
            config.seed
        );

        Ok(Self {
            analyzer: SpectralAnalyzer::new(config.analysis),
            snapshot: FeatureSnapshot::default(),
            particles,
            fractal: FractalTree::new(config.fractal),
            waveform: WaveformTracer::new(),
            compositor,
            toggles: StageToggles::default(),
            rotation_angle: 0.0,
            warp_time: 0.0,
            frames: 0,
            rng,
        })
    }

    /// Reallocate layers for a new output size; on failure the old layers stay in use
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), CanvasError> {
        if (width, height) == (self.width(), self.height()) {
            return Ok(());
        }
        if let Err(e) = self.compositor.resize(width, height) {
            warn!(
                "Resize to {}x{} failed ({}), keeping {}x{}",
                width,
                height,
                e,
                self.width(),
                self.height()
            );
            return Err(e);
        }
        Ok(())
    }

    /// Forget analyzer history and restart the rotation/warp accumulators
    pub fn reset(&mut self) {
        self.analyzer.reset();
        self.snapshot = FeatureSnapshot::default();
        self.rotation_angle = 0.0;
        self.warp_time = 0.0;
        debug!("Pipeline reset");
    }

    pub fn width(&self) -> u32 {
        self.compositor.width()
    }

    pub fn height(&self) -> u32 {
        self.compositor.height()
    }

    pub fn snapshot(&self) -> &FeatureSnapshot {
        &self.snapshot
    }

    pub fn toggles(&self) -> StageToggles {
        self.toggles
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    pub fn rotation_angle(&self) -> f32 {
        self.rotation_angle
    }

    pub fn warp_time(&self) -> f32 {
        self.warp_time
    }

    /// Frames composited so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Last finished frame
    pub fn frame(&self) -> &Layer {
        self.compositor.main()
    }

    /// Capture from `source` and run one frame; a paused pipeline does nothing
    ///
    /// Returns true when a new frame was composited.
    pub fn tick<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
        controls: &ControlFlags,
        time_s: f32,
    ) -> bool {
        if controls.paused {
            return false;
        }
        let block_size = self.analyzer.config().block_size;
        let captured = capture(source, block_size, &mut self.rng);
        self.follow_format(source.format());
        self.step(&captured, controls, time_s);
        true
    }

    /// Rebuild the analyzer when the source now delivers a different rate
    ///
    /// A reopened device may run at another sample rate; the band bin ranges
    /// depend on it. History is dropped with the old analyzer.
    fn follow_format(&mut self, format: StreamFormat) {
        let current = self.analyzer.config();
        if format.sample_rate_hz == current.sample_rate_hz {
            return;
        }
        info!(
            "Source rate changed {}Hz -> {}Hz, rebuilding analyzer",
            current.sample_rate_hz, format.sample_rate_hz
        );
        let config = AnalysisConfig {
            sample_rate_hz: format.sample_rate_hz,
            channels: format.channels,
            ..current.clone()
        };
        self.analyzer = SpectralAnalyzer::new(config);
    }

    /// Run one frame on an already captured block
    ///
    /// A missing block reuses the previous snapshot; everything else still advances.
    pub fn step(&mut self, captured: &Capture, controls: &ControlFlags, time_s: f32) {
        if let Some(frame) = captured.frame() {
            let mono = to_mono(frame);
            self.snapshot = self.analyzer.analyze(&mono);
        }
        let snapshot = self.snapshot;
        let energy = snapshot.energy;

        self.rotation_angle += energy * 0.02;
        self.warp_time += 0.01 + energy * 0.1;

        let bounds = Vec2::new(self.width() as f32, self.height() as f32);
        self.particles.update(energy, time_s, bounds, &mut self.rng);
        self.fractal.update(&snapshot);
        let samples = self
            .analyzer
            .history()
            .waveform
            .latest()
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        self.waveform.update(samples, energy, time_s, bounds);

        let toggles = StageToggles::evaluate(controls, &snapshot, &self.compositor.params().thresholds);
        if toggles != self.toggles {
            debug!("Stages: {:?}", toggles);
        }
        self.toggles = toggles;

        let ctx = FrameContext {
            snapshot,
            spectrum: self.analyzer.latest_spectrum(),
            particles: &self.particles,
            fractal: &self.fractal,
            waveform: &self.waveform,
            rotation_angle: self.rotation_angle,
            warp_time: self.warp_time,
            time_s,
            band_scale: self.analyzer.config().band_scale,
            toggles,
        };
        self.compositor.render(&ctx, &mut self.rng);
        self.frames += 1;
    }
}

/// One-line summary of the current features and modes
pub fn info_text(snapshot: &FeatureSnapshot, controls: &ControlFlags, fps: f32) -> String {
    let on_off = |flag: bool| if flag { "ON" } else { "OFF" };
    format!(
        "FPS: {:.1} | Bass: {:.2} | Mid: {:.2} | Treble: {:.2} | Energy: {:.2} | Transient: {:.2} | Crazy: {} | Extra: {}",
        fps,
        snapshot.bass,
        snapshot.mid,
        snapshot.treble,
        snapshot.energy,
        snapshot.transient,
        on_off(controls.crazy),
        on_off(controls.extra_crazy),
    )
}

/// Render `frames` frames into `sink` without a window
///
/// Time advances by exactly one frame interval per frame. `stop` is checked
/// between frames; a frame is either fully presented or not started.
/// Returns the number of frames presented.
pub fn run_headless<S, K>(
    state: &mut PipelineState,
    source: &mut S,
    sink: &mut K,
    frames: u64,
    fps: u32,
    controls: &ControlFlags,
    stop: &AtomicBool,
) -> Result<u64, SinkError>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
{
    let interval = 1.0 / fps.max(1) as f32;
    let controls = ControlFlags {
        paused: false,
        ..*controls
    };
    let mut presented = 0;

    while presented < frames {
        if stop.load(Ordering::Acquire) {
            info!("Stop requested after {} frames", presented);
            break;
        }
        state.tick(source, &controls, presented as f32 * interval);
        sink.present(state.frame())?;
        presented += 1;
    }

    Ok(presented)
}
