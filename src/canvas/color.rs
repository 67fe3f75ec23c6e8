//! 8-bit RGBA colours built from HSV.

use palette::{FromColor, Hsv, Srgb};

/// Straight (non-premultiplied) 8-bit colour
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Colour from hue in turns (wrapped into [0, 1)), saturation and value in [0, 1]
    pub fn from_hsv(hue: f32, saturation: f32, value: f32, alpha: u8) -> Self {
        let hsv: Hsv = Hsv::new(
            hue.rem_euclid(1.0) * 360.0,
            saturation.clamp(0.0, 1.0),
            value.clamp(0.0, 1.0),
        );
        let rgb = Srgb::from_color(hsv).into_format::<u8>();
        Self::new(rgb.red, rgb.green, rgb.blue, alpha)
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}
