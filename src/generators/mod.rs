//! Audio-reactive generators.
//!
//! Each generator reads the current `FeatureSnapshot` and draws into a
//! layer it is handed by the compositor; none of them touch the main buffer.

mod events;
mod fractal;
mod kaleidoscope;
mod particles;
mod spectrum_ring;
mod waveform;

use std::f32::consts::TAU;

use glam::Vec2;

// Re-export public types
pub use events::{draw_explosion, draw_lightning, draw_shockwave, draw_tunnel, should_fire};
pub use fractal::{BranchSegment, FractalTree};
pub use kaleidoscope::{
    draw_ripples, draw_warp, segment_angles, segment_count, tile_segments,
};
pub use particles::{Particle, ParticleField, ParticleShape};
pub use spectrum_ring::draw_spectrum_ring;
pub use waveform::WaveformTracer;

/// Vertices of a regular polygon, first vertex at `rotation` radians
pub(crate) fn regular_polygon(center: Vec2, radius: f32, sides: usize, rotation: f32) -> Vec<Vec2> {
    (0..sides)
        .map(|i| center + Vec2::from_angle(rotation + i as f32 * TAU / sides as f32) * radius)
        .collect()
}

/// Star outline alternating outer and inner vertices, `tips` outer points
pub(crate) fn star_polygon(
    center: Vec2,
    outer: f32,
    inner: f32,
    tips: usize,
    rotation: f32,
) -> Vec<Vec2> {
    let step = TAU / (tips * 2) as f32;
    (0..tips * 2)
        .map(|i| {
            let radius = if i % 2 == 0 { outer } else { inner };
            center + Vec2::from_angle(rotation + i as f32 * step) * radius
        })
        .collect()
}
