//! Radial bar chart of the lowest spectrum bins.

use std::f32::consts::TAU;

use glam::Vec2;

use crate::canvas::{Layer, Rgba};

const BAR_WIDTH: f32 = 3.0;
const BAR_ALPHA: u8 = 200;

/// One bar per bin around `center`: hue from bin index, length from
/// magnitude normalized by `scale` (clamped to 1)
///
/// Bars start at 20% of `radius` and span up to the remaining 80%.
pub fn draw_spectrum_ring(
    layer: &mut Layer,
    center: Vec2,
    radius: f32,
    spectrum: &[f32],
    bins: usize,
    scale: f32,
) {
    let inner = radius * 0.2;
    for (i, &magnitude) in spectrum.iter().take(bins).enumerate() {
        let level = (magnitude / scale).min(1.0);
        let fraction = i as f32 / bins as f32;
        let direction = Vec2::from_angle(fraction * TAU);
        let outer = inner + radius * 0.8 * level;

        let color = Rgba::from_hsv(fraction, 1.0, 1.0, BAR_ALPHA);
        layer.line(center + direction * inner, center + direction * outer, BAR_WIDTH, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loud_bin_reaches_outer_radius() {
        let mut layer = Layer::new(200, 200).unwrap();
        let mut spectrum = vec![0.0; 100];
        spectrum[0] = 50.0;

        draw_spectrum_ring(&mut layer, Vec2::new(100.0, 100.0), 80.0, &spectrum, 100, 5.0);

        // Bin 0 points along +x, from r=16 to r=80
        assert!(layer.pixel(100 + 70, 100).map_or(false, |p| p[3] > 0));
        // Quiet bin 25 (pointing down) stays a dot at the inner radius
        assert_eq!(layer.pixel(100, 100 + 40), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_only_first_bins_are_drawn() {
        let mut layer = Layer::new(200, 200).unwrap();
        let mut spectrum = vec![0.0; 513];
        // Beyond the drawn range
        spectrum[300] = 100.0;

        draw_spectrum_ring(&mut layer, Vec2::new(100.0, 100.0), 80.0, &spectrum, 100, 5.0);
        assert_eq!(layer.pixel(100 + 70, 100 + 5), Some([0, 0, 0, 0]));
    }
}
