//! Rendering surface abstraction and a retained canvas

use crate::utils::LatLon;
use crate::viewport::{MapTransform, Pixel};

/// An sRGB color with straight alpha
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub const fn with_alpha(self, alpha: u8) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, alpha])
    }

    #[inline]
    pub fn alpha(self) -> u8 {
        self.0[3]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointStyle {
    pub radius: f32,
    pub fill: Rgba,
    /// Stroke width and color drawn around the fill
    pub outline: Option<(f32, Rgba)>,
}

impl PointStyle {
    pub const fn filled(radius: f32, fill: Rgba) -> Self {
        Self {
            radius,
            fill,
            outline: None,
        }
    }

    pub const fn outlined(self, width: f32, color: Rgba) -> Self {
        Self {
            outline: Some((width, color)),
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathStyle {
    pub width: f32,
    pub color: Rgba,
}

/// One recorded draw call
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Point { at: Pixel, style: PointStyle },
    Path { points: Vec<Pixel>, style: PathStyle },
}

/// A pixel-addressable surface the renderer draws into.
///
/// Coordinates are relative to the surface's top-left corner, which sits at the map
/// widget's top-left corner at the moment of the last redraw.
pub trait RenderSurface {
    /// Match the surface's pixel dimensions to the viewport
    fn resize(&mut self, width: f32, height: f32);

    /// Record which geographic position was at `pixel` when this frame was drawn
    fn set_anchor(&mut self, position: LatLon, pixel: Pixel);

    fn clear(&mut self);

    fn fill_point(&mut self, at: Pixel, style: PointStyle);

    fn stroke_path(&mut self, points: &[Pixel], style: PathStyle);
}

/// Retained surface: keeps the last frame's primitives so the UI can repaint them every
/// display frame without re-running the declutter pass
#[derive(Clone, Debug, Default)]
pub struct Canvas {
    size: (f32, f32),
    anchor: Option<(LatLon, Pixel)>,
    primitives: Vec<Primitive>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn size(&self) -> (f32, f32) {
        self.size
    }

    #[inline]
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn point_count(&self) -> usize {
        self.primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Point { .. }))
            .count()
    }

    pub fn path_count(&self) -> usize {
        self.primitives.len() - self.point_count()
    }

    /// Offset to apply to the recorded primitives so they line up with the map under
    /// `transform`. Zero right after a redraw, grows while the user drags the map.
    pub fn drift(&self, transform: &dyn MapTransform) -> (f32, f32) {
        match self.anchor {
            Some((position, pixel)) => {
                let now = transform.project(position);
                (now.x - pixel.x, now.y - pixel.y)
            }
            None => (0.0, 0.0),
        }
    }
}

impl RenderSurface for Canvas {
    fn resize(&mut self, width: f32, height: f32) {
        if self.size != (width, height) {
            tracing::debug!("Canvas resized to {width}x{height}");
            self.size = (width, height);
        }
    }

    fn set_anchor(&mut self, position: LatLon, pixel: Pixel) {
        self.anchor = Some((position, pixel));
    }

    fn clear(&mut self) {
        self.primitives.clear();
    }

    fn fill_point(&mut self, at: Pixel, style: PointStyle) {
        self.primitives.push(Primitive::Point { at, style });
    }

    fn stroke_path(&mut self, points: &[Pixel], style: PathStyle) {
        if points.is_empty() {
            return;
        }
        self.primitives.push(Primitive::Path {
            points: points.to_vec(),
            style,
        });
    }
}
