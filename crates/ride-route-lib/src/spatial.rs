//! Spatial queries over the node store
//!
//! Both queries are linear scans in the store's fixed iteration order, so a tie always goes
//! to the node that comes first (places before stations, lower id first). Reordering the
//! underlying set would change which of several equidistant nodes wins.

use crate::nodes::{Category, Node, NodeStore};
use crate::utils::LatLon;
use crate::viewport::{MapTransform, Pixel};

/// Read-only query view over a [`NodeStore`]
#[derive(Clone, Copy)]
pub struct SpatialQuery<'a> {
    store: &'a NodeStore,
}

impl<'a> SpatialQuery<'a> {
    pub fn new(store: &'a NodeStore) -> Self {
        Self { store }
    }

    /// Hit test: the node whose projected position is closest to `point`, if it is
    /// strictly closer than `threshold_px`
    pub fn nearest_to_pixel(
        &self,
        transform: &dyn MapTransform,
        point: Pixel,
        threshold_px: f32,
    ) -> Option<&'a Node> {
        profiling::scope!("SpatialQuery::nearest_to_pixel");

        let mut best: Option<(&'a Node, f32)> = None;
        for node in self.store.iter() {
            let distance = transform.project(node.position()).distance(point);
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((node, distance));
            }
        }

        best.filter(|&(_, distance)| distance < threshold_px)
            .map(|(node, _)| node)
    }

    /// The node of `category` geographically closest to `position`, by haversine distance
    pub fn nearest_in_category(&self, position: LatLon, category: Category) -> Option<&'a Node> {
        let mut best: Option<(&'a Node, f64)> = None;
        for node in self.store.category(category) {
            let distance = position.distance_to(node.position());
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((node, distance));
            }
        }
        best.map(|(node, _)| node)
    }
}
