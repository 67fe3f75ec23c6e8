//! Raster layer buffers.
//!
//! Every generator owns one `Layer` and draws only into it. Layers are
//! premultiplied RGBA pixmaps; blits between them use clamped blend modes.

mod color;

use glam::Vec2;
use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, LineCap, LineJoin, Paint, Path, PathBuilder,
    Pixmap, PixmapPaint, Rect, Stroke,
};

use crate::error::CanvasError;

// Re-export public types
pub use color::Rgba;
pub use tiny_skia::Transform;

/// How a source is combined with what is already on a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    /// Source-over alpha compositing
    Normal,
    /// Per-channel sum clamped to full scale
    Additive,
    /// Per-channel product
    Multiply,
}

impl From<Blend> for BlendMode {
    fn from(blend: Blend) -> Self {
        match blend {
            Blend::Normal => BlendMode::SourceOver,
            Blend::Additive => BlendMode::Plus,
            Blend::Multiply => BlendMode::Multiply,
        }
    }
}

/// One persistent RGBA canvas
pub struct Layer {
    pixmap: Pixmap,
}

impl Layer {
    /// Transparent layer of `width` x `height` pixels
    pub fn new(width: u32, height: u32) -> Result<Self, CanvasError> {
        Pixmap::new(width, height)
            .map(|pixmap| Self { pixmap })
            .ok_or(CanvasError::Allocation { width, height })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width() as f32, self.height() as f32)
    }

    pub fn center(&self) -> Vec2 {
        self.size() * 0.5
    }

    /// Reset every pixel to transparent
    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    /// Fade towards black with a translucent black fill (trail decay)
    pub fn decay(&mut self, alpha: u8) {
        self.fill_all(Rgba::new(0, 0, 0, alpha), Blend::Normal);
    }

    /// Multiply the whole layer by `color`
    pub fn wash(&mut self, color: Rgba) {
        self.fill_all(color, Blend::Multiply);
    }

    fn fill_all(&mut self, color: Rgba, blend: Blend) {
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, self.width() as f32, self.height() as f32) {
            self.pixmap
                .fill_rect(rect, &paint(color, blend), Transform::identity(), None);
        }
    }

    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        if !(radius > 0.0) {
            return;
        }
        if let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) {
            self.fill(&path, color);
        }
    }

    /// Circle outline of stroke `width` centred on `radius`
    pub fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Rgba) {
        if !(radius > 0.0) {
            return;
        }
        if let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) {
            self.stroke(&path, width, color);
        }
    }

    /// Band of `width` pixels lying inside `outer_radius`; solid disc when `width >= outer_radius`
    pub fn ring(&mut self, center: Vec2, outer_radius: f32, width: f32, color: Rgba) {
        if width >= outer_radius {
            self.fill_circle(center, outer_radius, color);
        } else {
            self.stroke_circle(center, outer_radius - width * 0.5, width, color);
        }
    }

    pub fn line(&mut self, from: Vec2, to: Vec2, width: f32, color: Rgba) {
        self.polyline(&[from, to], width, color);
    }

    /// Open connected line; fewer than 2 points draws nothing
    pub fn polyline(&mut self, points: &[Vec2], width: f32, color: Rgba) {
        if points.len() < 2 {
            return;
        }
        if let Some(path) = build_path(points, false) {
            self.stroke(&path, width, color);
        }
    }

    /// Filled closed polygon; fewer than 3 points draws nothing
    pub fn fill_polygon(&mut self, points: &[Vec2], color: Rgba) {
        if points.len() < 3 {
            return;
        }
        if let Some(path) = build_path(points, true) {
            self.fill(&path, color);
        }
    }

    /// Closed polygon outline; fewer than 3 points draws nothing
    pub fn stroke_polygon(&mut self, points: &[Vec2], width: f32, color: Rgba) {
        if points.len() < 3 {
            return;
        }
        if let Some(path) = build_path(points, true) {
            self.stroke(&path, width, color);
        }
    }

    /// Axis-aligned square outline with side `side` around `center`
    pub fn stroke_square(&mut self, center: Vec2, side: f32, width: f32, color: Rgba) {
        let half = side * 0.5;
        let Some(rect) = Rect::from_xywh(center.x - half, center.y - half, side, side) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        self.stroke(&path, width, color);
    }

    /// Composite `src` onto this layer through `transform`
    pub fn blit(&mut self, src: &Layer, transform: Transform, blend: Blend) {
        let paint = PixmapPaint {
            opacity: 1.0,
            blend_mode: blend.into(),
            quality: FilterQuality::Bilinear,
        };
        self.pixmap
            .draw_pixmap(0, 0, src.pixmap.as_ref(), &paint, transform, None);
    }

    /// Premultiplied `[r, g, b, a]` at a pixel, `None` outside the layer
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixmap
            .pixel(x, y)
            .map(|p| [p.red(), p.green(), p.blue(), p.alpha()])
    }

    /// True when no pixel carries any coverage
    pub fn is_blank(&self) -> bool {
        self.pixmap.pixels().iter().all(|p| p.alpha() == 0)
    }

    /// Number of pixels with any colour
    pub fn lit_pixels(&self) -> usize {
        self.pixmap
            .pixels()
            .iter()
            .filter(|p| p.red() > 0 || p.green() > 0 || p.blue() > 0)
            .count()
    }

    /// Raw premultiplied RGBA8 bytes, row-major
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Opaque RGBA8 bytes as seen over a black background
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.pixels().len() * 4);
        for p in self.pixmap.pixels() {
            out.extend_from_slice(&[p.red(), p.green(), p.blue(), 255]);
        }
        out
    }

    fn fill(&mut self, path: &Path, color: Rgba) {
        self.pixmap.fill_path(
            path,
            &paint(color, Blend::Normal),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    fn stroke(&mut self, path: &Path, width: f32, color: Rgba) {
        let stroke = Stroke {
            width: width.max(0.5),
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            path,
            &paint(color, Blend::Normal),
            &stroke,
            Transform::identity(),
            None,
        );
    }
}

fn paint(color: Rgba, blend: Blend) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint.blend_mode = blend.into();
    paint
}

fn build_path(points: &[Vec2], close: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for p in rest {
        pb.line_to(p.x, p.y);
    }
    if close {
        pb.close();
    }
    pb.finish()
}
