//! Kaleidoscope tiling with ripple and warp overlays.

use std::f32::consts::{PI, TAU};

use glam::Vec2;

use super::regular_polygon;
use crate::analysis::FeatureSnapshot;
use crate::canvas::{Blend, Layer, Rgba, Transform};

const RIPPLE_SPACING: usize = 10;
const RIPPLE_WIDTH: f32 = 3.0;
const RIPPLE_ALPHA: u8 = 100;
const WARP_ALPHA: u8 = 180;
const CURVE_STEPS: usize = 20;
const SPIRAL_STEPS: usize = 30;

/// Angular segments for the current energy: `base + floor(energy * base)`
pub fn segment_count(energy: f32, base: usize) -> usize {
    base + (energy.clamp(0.0, 1.0) * base as f32).floor() as usize
}

/// Rotation of each segment: `i * 2π/count + rotation`
pub fn segment_angles(count: usize, rotation: f32) -> Vec<f32> {
    let step = TAU / count.max(1) as f32;
    (0..count).map(|i| i as f32 * step + rotation).collect()
}

/// Copy the `segment`-sized region of `source` at `source_origin`, then paste
/// it once per angle, rotated about its centre and centred on `dst`
pub fn tile_segments(
    dst: &mut Layer,
    segment: &mut Layer,
    source: &Layer,
    source_origin: Vec2,
    angles: &[f32],
) {
    segment.clear();
    segment.blit(
        source,
        Transform::from_translate(-source_origin.x, -source_origin.y),
        Blend::Normal,
    );

    let half = segment.center();
    let target = dst.center();
    for &angle in angles {
        // Counter-clockwise on screen (y grows downwards)
        let transform = Transform::from_translate(-half.x, -half.y)
            .post_concat(Transform::from_rotate(-angle.to_degrees()))
            .post_translate(target.x, target.y);
        dst.blit(segment, transform, Blend::Normal);
    }
}

/// Concentric rings every 10 px whose radii wobble with energy
pub fn draw_ripples(layer: &mut Layer, energy: f32, warp_time: f32) {
    let size = layer.width().min(layer.height()) as usize;
    let center = layer.center();

    for radius in (0..size / 2).step_by(RIPPLE_SPACING) {
        let r = radius as f32;
        let wobble = (30.0 * energy * (r / 10.0 - warp_time * 5.0).sin()).trunc();
        let hue = r / size as f32 + warp_time * 0.1;
        let color = Rgba::from_hsv(hue, 0.8, 1.0, RIPPLE_ALPHA);
        layer.ring(center, r + wobble, RIPPLE_WIDTH, color);
    }
}

/// Band-coloured distortion primitives in a fixed round-robin
/// (disc, line, curve, spiral, polygon)
pub fn draw_warp(layer: &mut Layer, snapshot: &FeatureSnapshot, warp_time: f32, primitives: usize) {
    let energy = snapshot.energy;
    let size = layer.width().min(layer.height()) as f32;
    let center = layer.center();
    let reach = size / 3.0 * energy;
    let width = (3.0 + energy * 5.0).floor();

    for i in 0..primitives {
        let t = warp_time * (0.5 + i as f32 * 0.1);
        let a = center + Vec2::new((t * 1.1).sin(), (t * 0.7).cos()) * reach;
        let b = center + Vec2::new((t * 1.3 + 2.0).sin(), (t * 0.9 + 2.0).cos()) * reach;
        let radius = (20.0 + t.sin() * 10.0) * (0.5 + energy * 1.5);

        let band = snapshot.band(i);
        let hue = t * 0.1 + i as f32 / primitives as f32 + band * 0.2;
        let color = Rgba::from_hsv(hue, 0.9, 0.8 + band * 0.2, WARP_ALPHA);

        match i % 5 {
            0 => layer.fill_circle(a, radius, color),
            1 => layer.line(a, b, width, color),
            2 => {
                let points: Vec<Vec2> = (0..=CURVE_STEPS)
                    .map(|step| {
                        let s = step as f32 / CURVE_STEPS as f32;
                        let phase = s * TAU + t;
                        a.lerp(b, s) + Vec2::new(phase.sin(), phase.cos()) * 50.0 * energy
                    })
                    .collect();
                layer.polyline(&points, width, color);
            }
            3 => {
                let points: Vec<Vec2> = (0..SPIRAL_STEPS)
                    .map(|step| {
                        let s = step as f32 / SPIRAL_STEPS as f32;
                        a + Vec2::from_angle(s * 10.0 * PI + t) * (s * radius)
                    })
                    .collect();
                layer.polyline(&points, width, color);
            }
            _ => {
                let points = regular_polygon(a, radius, 5 + i % 4, t);
                layer.stroke_polygon(&points, width, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_segment_count_grows_with_energy() {
        assert_eq!(segment_count(0.0, 8), 8);
        assert_eq!(segment_count(0.1, 8), 8);
        assert_eq!(segment_count(0.5, 8), 12);
        assert_eq!(segment_count(1.0, 8), 16);
    }

    #[test]
    fn test_eight_segments_cover_full_turn() {
        let rotation = 0.3;
        let angles = segment_angles(segment_count(0.0, 8), rotation);
        assert_eq!(angles.len(), 8);

        for pair in angles.windows(2) {
            assert_abs_diff_eq!(pair[1] - pair[0], FRAC_PI_4, epsilon = 1e-5);
        }
        assert_abs_diff_eq!(angles[0], rotation);
        assert_abs_diff_eq!(angles[7] + FRAC_PI_4 - angles[0], TAU, epsilon = 1e-5);
    }

    #[test]
    fn test_tiling_copies_source_region() {
        let mut source = Layer::new(100, 100).unwrap();
        let mut segment = Layer::new(20, 20).unwrap();
        let mut dst = Layer::new(40, 40).unwrap();

        // Only the area outside the copied region is lit
        source.fill_circle(Vec2::new(10.0, 10.0), 6.0, Rgba::new(255, 255, 255, 255));
        tile_segments(&mut dst, &mut segment, &source, Vec2::new(50.0, 50.0), &segment_angles(8, 0.0));
        assert!(dst.is_blank());

        // Off-centre inside the region, so rotated copies land apart
        source.fill_circle(Vec2::new(55.0, 55.0), 3.0, Rgba::new(255, 255, 255, 255));
        tile_segments(&mut dst, &mut segment, &source, Vec2::new(50.0, 50.0), &segment_angles(8, 0.0));
        assert!(!segment.is_blank());
        assert!(dst.lit_pixels() > segment.lit_pixels());
    }

    #[test]
    fn test_silent_ripples_are_evenly_spaced() {
        let mut layer = Layer::new(100, 100).unwrap();
        draw_ripples(&mut layer, 0.0, 0.0);

        // Rings at radii 10, 20, ... with width 3 drawn inward
        assert!(layer.pixel(50 + 9, 50).map_or(false, |p| p[3] > 0));
        assert_eq!(layer.pixel(50 + 4, 50), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_warp_draws_at_any_energy() {
        for energy in [0.0, 0.5, 1.0] {
            let mut layer = Layer::new(120, 120).unwrap();
            let snapshot = FeatureSnapshot {
                bass: energy,
                mid: energy,
                treble: energy,
                energy,
                transient: 0.0,
            };
            draw_warp(&mut layer, &snapshot, 1.0, 20);
            assert!(!layer.is_blank());
        }
    }
}
