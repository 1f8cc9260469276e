//! Level-of-detail declutter policy for place nodes
//!
//! Stations and priority nodes are always drawn. Place nodes are drawn in full from
//! `full_zoom` up, thinned to one per pixel cell between `grid_zoom` and `full_zoom`, and
//! hidden below `grid_zoom`. The claim set lives for exactly one frame.

use crate::nodes::Category;
use crate::viewport::Pixel;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Integer cell coordinates on the declutter grid
pub type CellKey = (i32, i32);

/// Zoom thresholds and cell size for decluttering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodConfig {
    /// Below this zoom place nodes are never drawn. Default: 16
    pub grid_zoom: f64,
    /// From this zoom on every place node is drawn. Default: 17
    pub full_zoom: f64,
    /// Edge length of a declutter cell in pixels. Default: 25
    pub cell_px: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            grid_zoom: 16.0,
            full_zoom: 17.0,
            cell_px: 25.0,
        }
    }
}

impl LodConfig {
    #[inline]
    pub fn cell_of(&self, pixel: Pixel) -> CellKey {
        (
            (pixel.x / self.cell_px).floor() as i32,
            (pixel.y / self.cell_px).floor() as i32,
        )
    }
}

/// Decide whether one node is drawn this frame.
///
/// Pure apart from `claimed`, which must be the current frame's claim set. Only place nodes
/// in the grid zoom band claim cells.
pub fn should_draw(
    category: Category,
    is_priority: bool,
    zoom: f64,
    pixel: Pixel,
    config: &LodConfig,
    claimed: &mut HashSet<CellKey>,
) -> bool {
    if category.is_station() || is_priority {
        return true;
    }
    if zoom >= config.full_zoom {
        return true;
    }
    if zoom < config.grid_zoom {
        return false;
    }
    claimed.insert(config.cell_of(pixel))
}

/// Claim set for a single frame
#[derive(Debug, Clone)]
pub struct DeclutterGrid {
    config: LodConfig,
    zoom: f64,
    claimed: HashSet<CellKey>,
}

impl DeclutterGrid {
    /// Start a fresh frame at `zoom`; nothing is claimed yet
    pub fn begin_frame(config: LodConfig, zoom: f64) -> Self {
        Self {
            config,
            zoom,
            claimed: HashSet::new(),
        }
    }

    /// Whether the node at `pixel` is drawn; claims its cell when it is a thinned place
    #[inline]
    pub fn admit(&mut self, category: Category, is_priority: bool, pixel: Pixel) -> bool {
        should_draw(
            category,
            is_priority,
            self.zoom,
            pixel,
            &self.config,
            &mut self.claimed,
        )
    }

    #[inline]
    pub fn claimed_cells(&self) -> usize {
        self.claimed.len()
    }

    #[inline]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }
}
