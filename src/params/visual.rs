//! Generator and compositor parameters.
//!
//! Lengths are in pixels, lifetimes in frames, angles in radians.

use std::ops::RangeInclusive;

/// Particle field parameters
#[derive(Debug, Clone)]
pub struct ParticleParams {
    /// Fixed pool size (particles are respawned, never destroyed)
    pub count: usize,

    /// Base radius range (pixels)
    pub size_range: RangeInclusive<u32>,

    /// Per-channel colour range (0-255)
    pub color_range: RangeInclusive<u8>,

    /// Maximum absolute velocity component (pixels per unit energy per frame, before gain)
    pub max_speed: f32,

    /// Lifetime range (frames)
    pub lifetime_range: RangeInclusive<i32>,

    /// Maximum absolute rotation speed (radians per unit energy per frame, before gain)
    pub max_rotation_speed: f32,

    /// Distance outside the canvas before a particle respawns (pixels)
    pub respawn_margin: f32,

    /// Formula: displacement = velocity * energy * velocity_gain
    pub velocity_gain: f32,

    /// Formula: perturbation = sin/cos(2t + 0.01 * position) * energy * chaos_gain
    pub chaos_gain: f32,

    /// Formula: rotation += rotation_speed * energy * rotation_gain
    pub rotation_gain: f32,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            count: 200,
            size_range: 3..=20,
            color_range: 100..=255,
            max_speed: 3.0,
            lifetime_range: 50..=200,
            max_rotation_speed: 0.2,
            respawn_margin: 100.0,
            velocity_gain: 25.0,
            chaos_gain: 15.0,
            rotation_gain: 5.0,
        }
    }
}

impl ParticleParams {
    /// Lifetime used as the fully-opaque reference for alpha fading
    pub fn max_lifetime(&self) -> i32 {
        *self.lifetime_range.end()
    }
}

/// Children spawned by each fractal segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCount {
    /// `3 + depth mod 2` children
    Alternating,
    /// Same number of children at every level
    Fixed(usize),
}

impl BranchCount {
    pub fn at_depth(self, depth: u32) -> usize {
        match self {
            Self::Alternating => 3 + (depth % 2) as usize,
            Self::Fixed(n) => n,
        }
    }
}

/// Fractal branch tree parameters
#[derive(Debug, Clone)]
pub struct FractalParams {
    /// Trunk length with silent mids (pixels)
    pub base_length: f32,

    /// Formula: length = base_length + mid * mid_length_scale
    pub mid_length_scale: f32,

    /// Formula: depth = min_depth + floor(treble * treble_depth_scale)
    pub min_depth: u32,
    pub treble_depth_scale: f32,

    /// Hard ceiling on recursion depth regardless of audio
    pub max_depth: u32,

    /// Formula: hue += bass * bass_hue_rate (wraps at 1.0)
    pub bass_hue_rate: f32,

    /// Formula: chaos = energy * energy_chaos_scale
    pub energy_chaos_scale: f32,

    /// Formula: spread = base_spread + mid * mid_spread_scale
    pub base_spread: f32,
    pub mid_spread_scale: f32,

    /// Per-level hue offset
    pub depth_hue_step: f32,

    pub branching: BranchCount,
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            base_length: 100.0,
            mid_length_scale: 200.0,
            min_depth: 2,
            treble_depth_scale: 6.0,
            max_depth: 8,
            bass_hue_rate: 0.03,
            energy_chaos_scale: 2.0,
            base_spread: 0.4,
            mid_spread_scale: 0.4,
            depth_hue_step: 0.1,
            branching: BranchCount::Alternating,
        }
    }
}

/// Band levels above which the one-shot event layers fire (strict inequality)
#[derive(Debug, Clone)]
pub struct TriggerThresholds {
    pub shockwave_bass: f32,
    pub lightning_mid: f32,
    pub explosion_treble: f32,
    /// Only considered when the extra-crazy stages are enabled
    pub tunnel_energy: f32,
}

impl Default for TriggerThresholds {
    fn default() -> Self {
        Self {
            shockwave_bass: 0.7,
            lightning_mid: 0.75,
            explosion_treble: 0.8,
            tunnel_energy: 0.5,
        }
    }
}

/// Layer compositing parameters
#[derive(Debug, Clone)]
pub struct CompositorParams {
    /// Alpha of the black fill applied to trail layers each frame (0-255)
    pub main_decay_alpha: u8,
    pub particle_decay_alpha: u8,

    /// Kaleidoscope edge as a fraction of the shorter canvas side
    pub kaleidoscope_fraction: f32,

    /// Base kaleidoscope segment count (energy adds up to the same again)
    pub kaleidoscope_base_segments: usize,

    /// Spectrum bins drawn on the frequency ring
    pub ring_bins: usize,

    /// Frequency ring radius as a fraction of the shorter canvas side
    pub ring_fraction: f32,

    /// Alpha of the multiplied hue-shift wash (0-255)
    pub wash_alpha: u8,

    /// Distortion primitives drawn by the warp stage
    pub warp_primitives: usize,

    /// Rings drawn by the tunnel stage
    pub tunnel_rings: usize,

    pub thresholds: TriggerThresholds,
}

impl Default for CompositorParams {
    fn default() -> Self {
        Self {
            main_decay_alpha: 10,
            particle_decay_alpha: 10,
            kaleidoscope_fraction: 0.8,
            kaleidoscope_base_segments: 8,
            ring_bins: 100,
            ring_fraction: 0.4,
            wash_alpha: 40,
            warp_primitives: 20,
            tunnel_rings: 15,
            thresholds: TriggerThresholds::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternating_branch_count() {
        assert_eq!(BranchCount::Alternating.at_depth(2), 3);
        assert_eq!(BranchCount::Alternating.at_depth(3), 4);
        assert_eq!(BranchCount::Fixed(2).at_depth(3), 2);
    }
}
