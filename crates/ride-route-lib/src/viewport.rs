//! Map transform abstraction and a Web Mercator viewport
//!
//! The renderer and the hit test never reach into the map widget directly. They receive a
//! [`MapTransform`] handle from whoever owns the map, which keeps projection logic testable
//! with the plain [`Viewport`] below.

use crate::utils::{self, EARTH_MERCATOR_MAX, EARTH_MERCATOR_MIN, EARTH_SIZE_METERS, LatLon};
use serde::{Deserialize, Serialize};

/// Tile edge length in pixels at zoom 0
pub const TILE_SIZE_PX: f64 = 256.0;

/// A position on the rendering surface, relative to its top-left corner
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pixel {
    pub x: f32,
    pub y: f32,
}

impl Pixel {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in pixels
    #[inline]
    pub fn distance(self, other: Pixel) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    #[inline]
    pub fn offset(self, dx: f32, dy: f32) -> Pixel {
        Pixel::new(self.x + dx, self.y + dy)
    }
}

/// Read-only view of the current map transform
pub trait MapTransform {
    /// Project a geographic position to surface pixels
    fn project(&self, position: LatLon) -> Pixel;

    /// Current zoom level
    fn zoom(&self) -> f64;

    /// Surface size in pixels (width, height)
    fn size(&self) -> (f32, f32);

    /// Geographic position at the center of the surface
    fn center(&self) -> LatLon;

    /// Whether a pixel lies within the surface, extended by `margin` on every side
    fn contains(&self, pixel: Pixel, margin: f32) -> bool {
        let (w, h) = self.size();
        pixel.x >= -margin && pixel.y >= -margin && pixel.x <= w + margin && pixel.y <= h + margin
    }
}

/// Center, zoom and pixel size of a Web Mercator map view
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLon,
    pub zoom: f64,
    pub size_px: (f32, f32),
}

impl Viewport {
    pub fn new(center: LatLon, zoom: f64, size_px: (f32, f32)) -> Self {
        Self {
            center,
            zoom,
            size_px,
        }
    }

    /// Width of the whole world in pixels at the current zoom
    #[inline]
    pub fn world_size_px(&self) -> f64 {
        TILE_SIZE_PX * 2f64.powf(self.zoom)
    }

    /// Normalized world coordinates in [0, 1], y growing southwards
    #[inline]
    fn normalized(position: LatLon) -> (f64, f64) {
        let m = position.to_mercator();
        (
            (m.x() - EARTH_MERCATOR_MIN) / EARTH_SIZE_METERS,
            (EARTH_MERCATOR_MAX - m.y()) / EARTH_SIZE_METERS,
        )
    }

    /// Inverse of [`MapTransform::project`]
    pub fn unproject(&self, pixel: Pixel) -> LatLon {
        let world = self.world_size_px();
        let (cx, cy) = Self::normalized(self.center);
        let nx = cx + (pixel.x as f64 - self.size_px.0 as f64 / 2.0) / world;
        let ny = cy + (pixel.y as f64 - self.size_px.1 as f64 / 2.0) / world;
        utils::mercator_to_wgs84(
            nx * EARTH_SIZE_METERS + EARTH_MERCATOR_MIN,
            EARTH_MERCATOR_MAX - ny * EARTH_SIZE_METERS,
        )
    }

    /// Geographic corners of the view: (north-west, south-east)
    pub fn bounds(&self) -> (LatLon, LatLon) {
        (
            self.unproject(Pixel::new(0.0, 0.0)),
            self.unproject(Pixel::new(self.size_px.0, self.size_px.1)),
        )
    }
}

impl MapTransform for Viewport {
    fn project(&self, position: LatLon) -> Pixel {
        let world = self.world_size_px();
        let (cx, cy) = Self::normalized(self.center);
        let (nx, ny) = Self::normalized(position);
        Pixel::new(
            ((nx - cx) * world + self.size_px.0 as f64 / 2.0) as f32,
            ((ny - cy) * world + self.size_px.1 as f64 / 2.0) as f32,
        )
    }

    #[inline]
    fn zoom(&self) -> f64 {
        self.zoom
    }

    #[inline]
    fn size(&self) -> (f32, f32) {
        self.size_px
    }

    #[inline]
    fn center(&self) -> LatLon {
        self.center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seoul_view(zoom: f64) -> Viewport {
        Viewport::new(LatLon::new(37.505, 127.005), zoom, (800.0, 600.0))
    }

    #[test]
    fn test_center_projects_to_middle() {
        let view = seoul_view(15.0);
        let p = view.project(view.center);
        assert!((p.x - 400.0).abs() < 0.01);
        assert!((p.y - 300.0).abs() < 0.01);
    }

    #[test]
    fn test_north_is_up_east_is_right() {
        let view = seoul_view(15.0);
        let north = view.project(LatLon::new(37.51, 127.005));
        let east = view.project(LatLon::new(37.505, 127.01));
        assert!(north.y < 300.0);
        assert!(east.x > 400.0);
    }

    #[test]
    fn test_zoom_doubles_pixel_distance() {
        let a = LatLon::new(37.50, 127.00);
        let b = LatLon::new(37.51, 127.01);
        let d15 = seoul_view(15.0).project(a).distance(seoul_view(15.0).project(b));
        let d16 = seoul_view(16.0).project(a).distance(seoul_view(16.0).project(b));
        assert!((d16 / d15 - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_unproject_roundtrip() {
        let view = seoul_view(16.0);
        let position = LatLon::new(37.503, 127.001);
        let back = view.unproject(view.project(position));
        assert!((back.lat - position.lat).abs() < 1e-5);
        assert!((back.lon - position.lon).abs() < 1e-5);
    }

    #[test]
    fn test_bounds_contain_center() {
        let view = seoul_view(14.0);
        let (nw, se) = view.bounds();
        assert!(nw.lat > view.center.lat && se.lat < view.center.lat);
        assert!(nw.lon < view.center.lon && se.lon > view.center.lon);
    }

    #[test]
    fn test_contains_with_margin() {
        let view = seoul_view(15.0);
        assert!(view.contains(Pixel::new(0.0, 0.0), 0.0));
        assert!(!view.contains(Pixel::new(-5.0, 10.0), 0.0));
        assert!(view.contains(Pixel::new(-5.0, 10.0), 10.0));
    }
}
