//! One-shot event layers triggered by band thresholds.
//!
//! Each drawing function assumes a freshly cleared layer; the compositor
//! decides whether an event fires this frame via `should_fire`.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;

use super::{regular_polygon, star_polygon};
use crate::analysis::FeatureSnapshot;
use crate::canvas::{Layer, Rgba};

/// Strict threshold test: a level equal to the trigger does not fire
pub fn should_fire(level: f32, threshold: f32) -> bool {
    level > threshold
}

/// Three concentric rings spaced 50 px apart, radius and thickness growing with bass
pub fn draw_shockwave(layer: &mut Layer, center: Vec2, bass: f32, warp_time: f32) {
    let radius = (bass * 500.0).trunc();
    let thickness = (10.0 + bass * 30.0).trunc();

    for i in 0..3 {
        let hue = warp_time * 0.2 + i as f32 * 0.3;
        let color = Rgba::from_hsv(hue, 0.9, 1.0, 150);
        layer.ring(center, radius - i as f32 * 50.0, thickness, color);
    }
}

/// Jagged bolts from the top edge, with wider translucent glow passes
pub fn draw_lightning<R: Rng + ?Sized>(layer: &mut Layer, mid: f32, warp_time: f32, rng: &mut R) {
    let bounds = layer.size();
    let bolts = (mid * 5.0) as usize;
    let segments = 10 + (mid * 20.0) as usize;

    for _ in 0..bolts {
        let start_x = rng.gen_range(0..=bounds.x as i32) as f32;
        let mut current = Vec2::new(start_x, 0.0);
        let mut points = Vec::with_capacity(segments + 1);
        points.push(current);

        for i in 0..segments {
            // Wide swings near the top, straighter towards the bottom
            let sway = 1.0 - i as f32 / segments as f32;
            let dx = rng.gen_range(-80..=80) as f32 * sway * mid;
            let dy = rng.gen_range(10..=30) as f32 * mid;
            current = (current + Vec2::new(dx, dy)).clamp(Vec2::ZERO, bounds);
            points.push(current);
        }

        let hue = start_x / bounds.x + warp_time * 0.1;
        let Rgba { r, g, b, .. } = Rgba::from_hsv(hue, 0.7, 1.0, 255);
        layer.polyline(&points, (3.0 + mid * 5.0).trunc(), Rgba::new(r, g, b, 200));

        for pass in 0..3 {
            let width = (6.0 - pass as f32 * 2.0 + mid * 6.0).trunc();
            let alpha = 100 - pass * 30;
            layer.polyline(&points, width, Rgba::new(r, g, b, alpha));
        }
    }
}

/// Burst of dots around a jittered centre, some trailing outward streaks
pub fn draw_explosion<R: Rng + ?Sized>(
    layer: &mut Layer,
    center: Vec2,
    treble: f32,
    warp_time: f32,
    rng: &mut R,
) {
    let origin = center
        + Vec2::new(
            rng.gen_range(-200..=200) as f32,
            rng.gen_range(-200..=200) as f32,
        );
    let count = (treble * 100.0) as usize;

    for _ in 0..count {
        let angle = rng.gen::<f32>() * TAU;
        let distance = rng.gen::<f32>() * 100.0 * treble;
        let position = origin + Vec2::from_angle(angle) * distance;
        let size = rng.gen_range(2..=10) as f32;

        let color = Rgba::from_hsv(warp_time + distance / 100.0, 0.8, 1.0, 200);
        layer.fill_circle(position, size, color);

        if rng.gen::<f32>() < 0.3 {
            let tail = position + (position - origin) * 0.5;
            layer.line(position, tail, (size / 2.0).trunc().max(1.0), color.with_alpha(100));
        }
    }
}

/// Concentric rings cycling circle, square, star and triangle, each
/// coloured by one band in round-robin
pub fn draw_tunnel(
    layer: &mut Layer,
    center: Vec2,
    snapshot: &FeatureSnapshot,
    warp_time: f32,
    rings: usize,
) {
    let energy = snapshot.energy;
    let size = layer.size();
    let max_radius = ((size.x + size.y) / 2.0).floor();
    let phase = (warp_time * 2.0) as usize;

    for i in 0..rings {
        let progress = i as f32 / rings as f32;
        let distort = 1.0 + (warp_time * 2.0 + progress * PI * 4.0).sin() * 0.2 * energy;
        let radius = max_radius * progress * distort;
        let offset = Vec2::new(
            (warp_time + progress * PI).sin(),
            (warp_time * 1.3 + progress * PI).cos(),
        ) * 100.0
            * energy;
        let ring_center = center + offset.trunc();

        let band = snapshot.band(i);
        let color = Rgba::from_hsv(
            progress + warp_time * 0.1 + band * 0.2,
            0.7 + band * 0.3,
            0.6 + band * 0.4,
            150,
        );
        let thin = (10.0 * (1.0 - progress) * energy).trunc().max(1.0);
        let thick = (8.0 * (1.0 - progress) * energy).trunc().max(1.0);

        match (i + phase) % 4 {
            0 => layer.ring(ring_center, radius.trunc(), thin, color),
            1 => layer.stroke_square(ring_center, (radius * 1.8).trunc(), thin, color),
            2 => {
                let points = star_polygon(ring_center, radius, radius * 0.5, 5, warp_time);
                layer.stroke_polygon(&points, thick, color);
            }
            _ => {
                let points = regular_polygon(ring_center, radius, 3, warp_time);
                layer.stroke_polygon(&points, thick, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_threshold_is_strict() {
        assert!(!should_fire(0.7, 0.7));
        assert!(should_fire(0.7001, 0.7));
        assert!(!should_fire(0.2, 0.7));
    }

    #[test]
    fn test_shockwave_rings() {
        let mut layer = Layer::new(400, 400).unwrap();
        let center = Vec2::new(200.0, 200.0);
        draw_shockwave(&mut layer, center, 0.3, 0.0);

        // Outer ring 150 px, thickness 19: band 131..150
        assert!(layer.pixel(200 + 140, 200).map_or(false, |p| p[3] > 0));
        // Inside the innermost ring (50 px)
        assert_eq!(layer.pixel(200 + 20, 200), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_lightning_starts_at_top_and_stays_on_canvas() {
        let mut layer = Layer::new(300, 200).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        draw_lightning(&mut layer, 1.0, 0.0, &mut rng);

        let top_row_lit = (0..300).any(|x| layer.pixel(x, 0).map_or(false, |p| p[3] > 0));
        assert!(top_row_lit);
    }

    #[test]
    fn test_quiet_mid_draws_no_bolts() {
        let mut layer = Layer::new(100, 100).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        draw_lightning(&mut layer, 0.1, 0.0, &mut rng);
        assert!(layer.is_blank());
    }

    #[test]
    fn test_explosion_is_reproducible() {
        let draw = |seed| {
            let mut layer = Layer::new(600, 600).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            draw_explosion(&mut layer, Vec2::new(300.0, 300.0), 0.9, 0.5, &mut rng);
            layer.to_rgba8()
        };
        let first = draw(8);
        assert_eq!(first, draw(8));
        assert!(first.chunks_exact(4).any(|p| p[0] > 0 || p[1] > 0 || p[2] > 0));
    }

    #[test]
    fn test_tunnel_draws_every_shape() {
        let snapshot = FeatureSnapshot {
            bass: 0.8,
            mid: 0.6,
            treble: 0.4,
            energy: 0.6,
            transient: 0.0,
        };
        let mut layer = Layer::new(320, 240).unwrap();
        let center = layer.center();
        draw_tunnel(&mut layer, center, &snapshot, 0.0, 15);
        assert!(layer.lit_pixels() > 100);
    }
}
