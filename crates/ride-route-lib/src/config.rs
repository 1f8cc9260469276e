//! Tunables shared by the query, declutter and composition layers

use crate::{Category, LodConfig};
use serde::{Deserialize, Serialize};

/// Configuration for a map session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// A click selects the nearest node only if it is strictly closer than this, in pixels.
    /// Default: 20
    pub hit_threshold_px: f32,
    /// Zoom thresholds and cell size for place-node decluttering
    pub lod: LodConfig,
    /// Station category used for the ride leg when no e-bike mode is active.
    /// Default: [`Category::BikeStation`]
    pub default_ride_category: Category,
    /// Recompose the route automatically whenever start, destination or via stops change.
    /// Default: true
    pub auto_compose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hit_threshold_px: 20.0,
            lod: LodConfig::default(),
            default_ride_category: Category::BikeStation,
            auto_compose: true,
        }
    }
}
