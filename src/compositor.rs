//! Layer compositor.
//!
//! Owns one persistent layer per generator plus the main buffer, and is the
//! only writer of the main buffer. Every frame runs the same fixed sequence:
//! decay trail layers, clear one-shot layers, let generators draw into
//! their own layers, then merge them into main in order.

use glam::Vec2;
use log::{debug, info};
use rand::Rng;

use crate::analysis::FeatureSnapshot;
use crate::canvas::{Blend, Layer, Rgba, Transform};
use crate::error::CanvasError;
use crate::generators::{
    draw_explosion, draw_lightning, draw_ripples, draw_shockwave, draw_spectrum_ring, draw_tunnel,
    draw_warp, segment_angles, segment_count, should_fire, tile_segments, FractalTree,
    ParticleField, WaveformTracer,
};
use crate::params::{CompositorParams, TriggerThresholds};
use crate::pipeline::ControlFlags;

/// Optional stages for one frame, decided once before compositing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageToggles {
    pub kaleidoscope: bool,
    pub warp: bool,
    pub shockwave: bool,
    pub lightning: bool,
    pub explosion: bool,
    pub tunnel: bool,
}

impl StageToggles {
    pub fn evaluate(
        controls: &ControlFlags,
        snapshot: &FeatureSnapshot,
        thresholds: &TriggerThresholds,
    ) -> Self {
        let extra = controls.crazy && controls.extra_crazy;
        Self {
            kaleidoscope: controls.crazy,
            warp: extra,
            shockwave: should_fire(snapshot.bass, thresholds.shockwave_bass),
            lightning: should_fire(snapshot.mid, thresholds.lightning_mid),
            explosion: should_fire(snapshot.treble, thresholds.explosion_treble),
            tunnel: controls.extra_crazy && should_fire(snapshot.energy, thresholds.tunnel_energy),
        }
    }
}

/// Everything the compositor reads for one frame
pub struct FrameContext<'a> {
    pub snapshot: FeatureSnapshot,
    /// Latest magnitude spectrum, `None` before the first analyzed frame
    pub spectrum: Option<&'a [f32]>,
    pub particles: &'a ParticleField,
    pub fractal: &'a FractalTree,
    pub waveform: &'a WaveformTracer,
    /// Radians
    pub rotation_angle: f32,
    pub warp_time: f32,
    /// Seconds since start
    pub time_s: f32,
    /// Normalization used for spectrum ring bars
    pub band_scale: f32,
    pub toggles: StageToggles,
}

/// Every layer buffer, allocated together so a resize either fully succeeds or changes nothing
struct LayerSet {
    main: Layer,
    waveform: Layer,
    particles: Layer,
    fractal: Layer,
    kaleidoscope: Layer,
    segment: Layer,
    ripple: Layer,
    warp: Layer,
    ring: Layer,
    shockwave: Layer,
    lightning: Layer,
    explosion: Layer,
    tunnel: Layer,
}

impl LayerSet {
    fn new(width: u32, height: u32, params: &CompositorParams) -> Result<Self, CanvasError> {
        let side = kaleidoscope_side(width, height, params.kaleidoscope_fraction);
        Ok(Self {
            main: Layer::new(width, height)?,
            waveform: Layer::new(width, height)?,
            particles: Layer::new(width, height)?,
            fractal: Layer::new(width, height)?,
            kaleidoscope: Layer::new(side, side)?,
            segment: Layer::new(side / 2, side / 2)?,
            ripple: Layer::new(side, side)?,
            warp: Layer::new(side, side)?,
            ring: Layer::new(width, height)?,
            shockwave: Layer::new(width, height)?,
            lightning: Layer::new(width, height)?,
            explosion: Layer::new(width, height)?,
            tunnel: Layer::new(width, height)?,
        })
    }
}

/// Kaleidoscope edge (pixels), never below 2 so the half-size segment stays allocatable
fn kaleidoscope_side(width: u32, height: u32, fraction: f32) -> u32 {
    ((width.min(height) as f32 * fraction) as u32).max(2)
}

pub struct Compositor {
    params: CompositorParams,
    layers: LayerSet,
}

impl Compositor {
    pub fn new(width: u32, height: u32, params: CompositorParams) -> Result<Self, CanvasError> {
        let layers = LayerSet::new(width, height, &params)?;
        debug!(
            "Compositor: {}x{} canvas, {}px kaleidoscope",
            width,
            height,
            layers.kaleidoscope.width()
        );
        Ok(Self { params, layers })
    }

    pub fn params(&self) -> &CompositorParams {
        &self.params
    }

    /// Finished frame
    pub fn main(&self) -> &Layer {
        &self.layers.main
    }

    pub fn width(&self) -> u32 {
        self.layers.main.width()
    }

    pub fn height(&self) -> u32 {
        self.layers.main.height()
    }

    /// Reallocate every layer at the new size (contents start blank); on
    /// failure the current layers are kept
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), CanvasError> {
        let layers = LayerSet::new(width, height, &self.params)?;
        self.layers = layers;
        info!("Layers reallocated at {}x{}", width, height);
        Ok(())
    }

    /// Run the fixed per-frame sequence and leave the result in `main`
    pub fn render<R: Rng + ?Sized>(&mut self, ctx: &FrameContext<'_>, rng: &mut R) {
        let params = &self.params;
        let layers = &mut self.layers;
        let snapshot = &ctx.snapshot;
        let energy = snapshot.energy;
        let toggles = ctx.toggles;
        let center = layers.main.center();

        // 1. Trail decay
        layers.main.decay(params.main_decay_alpha);
        layers.particles.decay(params.particle_decay_alpha);

        // 2. One-shot layers start empty
        layers.waveform.clear();
        layers.fractal.clear();
        layers.kaleidoscope.clear();
        layers.ring.clear();

        // 3. Generators draw into their own layers
        ctx.waveform.draw(&mut layers.waveform);
        ctx.particles.draw(&mut layers.particles, ctx.time_s);
        if toggles.kaleidoscope {
            // Only visible through the kaleidoscope
            ctx.fractal
                .draw(&mut layers.fractal, center, ctx.rotation_angle, rng);
        }

        // 4. Kaleidoscope, with ripple and warp overlays
        if toggles.kaleidoscope {
            let segments = segment_count(energy, params.kaleidoscope_base_segments);
            let angles = segment_angles(segments, ctx.rotation_angle);
            tile_segments(
                &mut layers.kaleidoscope,
                &mut layers.segment,
                &layers.fractal,
                center,
                &angles,
            );

            layers.ripple.clear();
            draw_ripples(&mut layers.ripple, energy, ctx.warp_time);
            layers
                .kaleidoscope
                .blit(&layers.ripple, Transform::identity(), Blend::Additive);

            if toggles.warp {
                layers.warp.clear();
                draw_warp(&mut layers.warp, snapshot, ctx.warp_time, params.warp_primitives);
                layers
                    .kaleidoscope
                    .blit(&layers.warp, Transform::identity(), Blend::Additive);
            }

            let half = layers.kaleidoscope.center();
            layers.main.blit(
                &layers.kaleidoscope,
                Transform::from_translate(center.x - half.x, center.y - half.y),
                Blend::Additive,
            );
        }

        // 5. Frequency ring, composited normally
        if let Some(spectrum) = ctx.spectrum {
            let radius = (layers.main.width().min(layers.main.height()) as f32
                * params.ring_fraction)
                .floor();
            draw_spectrum_ring(
                &mut layers.ring,
                center,
                radius,
                spectrum,
                params.ring_bins,
                ctx.band_scale,
            );
            layers
                .main
                .blit(&layers.ring, Transform::identity(), Blend::Normal);
        }

        // 6. Waveform, squashed vertically about the centre line
        let scale = 0.5 + energy * 0.5;
        layers.main.blit(
            &layers.waveform,
            Transform::from_scale(1.0, scale).post_translate(0.0, center.y * (1.0 - scale)),
            Blend::Additive,
        );

        // 7. Particles
        layers
            .main
            .blit(&layers.particles, Transform::identity(), Blend::Additive);

        // 8. Threshold events
        if toggles.shockwave {
            layers.shockwave.clear();
            draw_shockwave(&mut layers.shockwave, center, snapshot.bass, ctx.warp_time);
            merge_additive(&mut layers.main, &layers.shockwave);
        }
        if toggles.lightning {
            layers.lightning.clear();
            draw_lightning(&mut layers.lightning, snapshot.mid, ctx.warp_time, rng);
            merge_additive(&mut layers.main, &layers.lightning);
        }
        if toggles.explosion {
            layers.explosion.clear();
            draw_explosion(&mut layers.explosion, center, snapshot.treble, ctx.warp_time, rng);
            merge_additive(&mut layers.main, &layers.explosion);
        }
        if toggles.tunnel {
            layers.tunnel.clear();
            draw_tunnel(
                &mut layers.tunnel,
                center,
                snapshot,
                ctx.warp_time,
                params.tunnel_rings,
            );
            merge_additive(&mut layers.main, &layers.tunnel);
        }

        // 9. Slow hue wash
        let wash = Rgba::from_hsv(ctx.warp_time * 0.05, 0.4, 0.8, params.wash_alpha);
        layers.main.wash(wash);
    }

    /// Centre of the canvas (pixels)
    pub fn center(&self) -> Vec2 {
        self.layers.main.center()
    }
}

fn merge_additive(main: &mut Layer, layer: &Layer) {
    main.blit(layer, Transform::identity(), Blend::Additive);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{FractalParams, ParticleParams};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Scene {
        particles: ParticleField,
        fractal: FractalTree,
        waveform: WaveformTracer,
        spectrum: Vec<f32>,
    }

    impl Scene {
        fn new(bounds: Vec2, rng: &mut StdRng) -> Self {
            let mut waveform = WaveformTracer::new();
            let samples: Vec<f32> = (0..256).map(|i| (i as f32 * 0.1).sin()).collect();
            waveform.update(&samples, 0.8, 0.0, bounds);
            Self {
                particles: ParticleField::new(ParticleParams::default(), bounds, rng),
                fractal: FractalTree::new(FractalParams::default()),
                waveform,
                spectrum: vec![3.0; 513],
            }
        }

        fn context(&self, snapshot: FeatureSnapshot, toggles: StageToggles) -> FrameContext<'_> {
            FrameContext {
                snapshot,
                spectrum: Some(&self.spectrum),
                particles: &self.particles,
                fractal: &self.fractal,
                waveform: &self.waveform,
                rotation_angle: 0.2,
                warp_time: 1.0,
                time_s: 0.5,
                band_scale: 5.0,
                toggles,
            }
        }
    }

    fn loud() -> FeatureSnapshot {
        FeatureSnapshot {
            bass: 0.9,
            mid: 0.8,
            treble: 0.85,
            energy: 0.85,
            transient: 1.0,
        }
    }

    #[test]
    fn test_toggles_follow_flags_and_thresholds() {
        let thresholds = TriggerThresholds::default();
        let calm = ControlFlags::default();

        let toggles = StageToggles::evaluate(&calm, &loud(), &thresholds);
        assert!(!toggles.kaleidoscope && !toggles.warp && !toggles.tunnel);
        assert!(toggles.shockwave && toggles.lightning && toggles.explosion);

        let wild = ControlFlags {
            crazy: true,
            extra_crazy: true,
            ..ControlFlags::default()
        };
        let toggles = StageToggles::evaluate(&wild, &loud(), &thresholds);
        assert!(toggles.kaleidoscope && toggles.warp && toggles.tunnel);
    }

    #[test]
    fn test_shockwave_fires_only_above_threshold() {
        let thresholds = TriggerThresholds::default();
        let flags = ControlFlags::default();
        let at = FeatureSnapshot {
            bass: 0.7,
            ..FeatureSnapshot::default()
        };
        let above = FeatureSnapshot {
            bass: 0.71,
            ..FeatureSnapshot::default()
        };

        assert!(!StageToggles::evaluate(&flags, &at, &thresholds).shockwave);
        assert!(StageToggles::evaluate(&flags, &above, &thresholds).shockwave);
    }

    #[test]
    fn test_tunnel_needs_extra_mode_and_energy() {
        let thresholds = TriggerThresholds::default();
        let extra = ControlFlags {
            extra_crazy: true,
            ..ControlFlags::default()
        };
        let quiet = FeatureSnapshot {
            energy: 0.5,
            ..FeatureSnapshot::default()
        };
        assert!(!StageToggles::evaluate(&extra, &quiet, &thresholds).tunnel);
        assert!(StageToggles::evaluate(&extra, &loud(), &thresholds).tunnel);
    }

    #[test]
    fn test_every_stage_renders() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut compositor = Compositor::new(320, 240, CompositorParams::default()).unwrap();
        let scene = Scene::new(Vec2::new(320.0, 240.0), &mut rng);

        let toggles = StageToggles {
            kaleidoscope: true,
            warp: true,
            shockwave: true,
            lightning: true,
            explosion: true,
            tunnel: true,
        };
        compositor.render(&scene.context(loud(), toggles), &mut rng);
        assert!(compositor.main().lit_pixels() > 1000);
    }

    fn peak(layer: &Layer) -> u8 {
        layer
            .to_rgba8()
            .chunks_exact(4)
            .map(|p| p[0].max(p[1]).max(p[2]))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_silent_frames_fade_out() {
        let mut rng = StdRng::seed_from_u64(2);
        let bounds = Vec2::new(64.0, 48.0);
        let mut compositor = Compositor::new(64, 48, CompositorParams::default()).unwrap();
        let scene = Scene::new(bounds, &mut rng);
        compositor.render(&scene.context(loud(), StageToggles::default()), &mut rng);
        assert!(peak(compositor.main()) > 100);

        let no_particles = ParticleParams {
            count: 0,
            ..ParticleParams::default()
        };
        let particles = ParticleField::new(no_particles, bounds, &mut rng);
        let fractal = FractalTree::new(FractalParams::default());
        let waveform = WaveformTracer::new();
        for _ in 0..600 {
            let ctx = FrameContext {
                snapshot: FeatureSnapshot::default(),
                spectrum: None,
                particles: &particles,
                fractal: &fractal,
                waveform: &waveform,
                rotation_angle: 0.0,
                warp_time: 0.0,
                time_s: 0.0,
                band_scale: 5.0,
                toggles: StageToggles::default(),
            };
            compositor.render(&ctx, &mut rng);
        }
        // 8-bit trail decay bottoms out at a faint residue
        assert!(peak(compositor.main()) <= 32);
    }

    /// Brightest red value across the given rows
    fn brightest_red(layer: &Layer, rows: std::ops::RangeInclusive<usize>) -> u8 {
        let stride = layer.width() as usize * 4;
        let bytes = layer.to_rgba8();
        rows.flat_map(|y| bytes[y * stride..(y + 1) * stride].chunks_exact(4).map(|p| p[0]))
            .max()
            .unwrap_or(0)
    }

    /// Render one frame holding only a red trace at y = 33..36 of a 64x48 canvas
    fn render_trace(energy: f32) -> Compositor {
        let mut rng = StdRng::seed_from_u64(4);
        let bounds = Vec2::new(64.0, 48.0);
        let mut waveform = WaveformTracer::new();
        let samples: Vec<f32> = (0..256).map(|i| if i % 2 == 0 { 0.75 } else { 1.0 }).collect();
        waveform.update(&samples, 1.0, 0.0, bounds);

        let no_particles = ParticleParams {
            count: 0,
            ..ParticleParams::default()
        };
        let particles = ParticleField::new(no_particles, bounds, &mut rng);
        let fractal = FractalTree::new(FractalParams::default());
        let ctx = FrameContext {
            snapshot: FeatureSnapshot {
                energy,
                ..FeatureSnapshot::default()
            },
            spectrum: None,
            particles: &particles,
            fractal: &fractal,
            waveform: &waveform,
            rotation_angle: 0.0,
            warp_time: 1.0,
            time_s: 0.0,
            band_scale: 5.0,
            toggles: StageToggles::default(),
        };

        let mut compositor = Compositor::new(64, 48, CompositorParams::default()).unwrap();
        compositor.render(&ctx, &mut rng);
        compositor
    }

    #[test]
    fn test_waveform_squashed_toward_centre_when_quiet() {
        // Half height: the trace lands around y = 28..30
        let quiet = render_trace(0.0);
        assert!(brightest_red(quiet.main(), 28..=30) > 128);
        assert!(brightest_red(quiet.main(), 33..=38) < 64);

        // Full height: the trace stays where it was drawn
        let loud = render_trace(1.0);
        assert!(brightest_red(loud.main(), 33..=36) > 128);
        assert!(brightest_red(loud.main(), 26..=30) < 64);
    }

    #[test]
    fn test_resize_reallocates_layers() {
        let mut compositor = Compositor::new(100, 80, CompositorParams::default()).unwrap();
        compositor.resize(200, 50).unwrap();
        assert_eq!((compositor.width(), compositor.height()), (200, 50));

        assert!(compositor.resize(0, 50).is_err());
        assert_eq!((compositor.width(), compositor.height()), (200, 50));
    }
}
