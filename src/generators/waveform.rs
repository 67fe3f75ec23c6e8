//! Oscilloscope-style trace of the latest mono block.

use glam::Vec2;

use crate::canvas::{Layer, Rgba};

const LINE_WIDTH: f32 = 2.0;

/// Polyline through the current samples; hue follows wall-clock time
#[derive(Debug, Default)]
pub struct WaveformTracer {
    points: Vec<Vec2>,
    hue: f32,
}

impl WaveformTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the trace: samples evenly spaced across `bounds.x`, amplitude scaled by energy
    pub fn update(&mut self, samples: &[f32], energy: f32, time_s: f32, bounds: Vec2) {
        self.points.clear();
        let center_y = bounds.y / 2.0;
        let amplitude = bounds.y / 4.0 * energy;
        let step = bounds.x / samples.len().max(1) as f32;

        self.points.extend(
            samples
                .iter()
                .enumerate()
                .map(|(i, &s)| Vec2::new(i as f32 * step, center_y + s * amplitude)),
        );
        self.hue = (time_s * 0.1).rem_euclid(1.0);
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn draw(&self, layer: &mut Layer) {
        let color = Rgba::from_hsv(self.hue, 1.0, 1.0, 255);
        layer.polyline(&self.points, LINE_WIDTH, color);
    }
}
