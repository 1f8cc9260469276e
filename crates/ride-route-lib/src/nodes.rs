//! Node storage module
//!
//! Nodes are fetched once per session and never change afterwards. The store keeps one
//! partition per [`Category`], each sorted by id, which fixes the iteration order used by
//! hit-test tie-breaks and by the declutter grid's first-claim rule.

use crate::utils::LatLon;
use geo::Rect;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Node identifier as issued by the routing service. Unique only within a category.
pub type NodeId = i64;

/// The kind of point a node represents
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Generic place (traffic node); dense, subject to decluttering
    Place,
    /// Pedal-bike rental station
    BikeStation,
    /// E-bike rental station
    EBikeStation,
}

impl Category {
    /// All categories in store iteration order
    pub const ALL: [Category; 3] = [Category::Place, Category::BikeStation, Category::EBikeStation];

    /// Stations are always rendered regardless of zoom
    #[inline]
    pub fn is_station(self) -> bool {
        matches!(self, Category::BikeStation | Category::EBikeStation)
    }

    /// Map the node listing's `type` field to a category.
    ///
    /// The service labels nodes without an explicit type as `traffic`, so anything
    /// unrecognised is treated as a place.
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "bicycle_station" => Category::BikeStation,
            "e_bicycle_station" => Category::EBikeStation,
            "traffic" => Category::Place,
            other => {
                tracing::debug!("Unknown node type {other:?}, treating as place");
                Category::Place
            }
        }
    }

    /// The node listing's name for this category
    pub fn wire_name(self) -> &'static str {
        match self {
            Category::Place => "traffic",
            Category::BikeStation => "bicycle_station",
            Category::EBikeStation => "e_bicycle_station",
        }
    }

    #[inline]
    fn index(self) -> usize {
        match self {
            Category::Place => 0,
            Category::BikeStation => 1,
            Category::EBikeStation => 2,
        }
    }
}

/// Globally unique identity of a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub category: Category,
    pub id: NodeId,
}

/// A single geolocated point
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
    pub category: Category,
}

impl Node {
    pub fn new(id: NodeId, lat: f64, lon: f64, category: Category) -> Self {
        Self {
            id,
            lat,
            lon,
            category,
        }
    }

    #[inline]
    pub fn key(&self) -> NodeKey {
        NodeKey {
            category: self.category,
            id: self.id,
        }
    }

    #[inline]
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// Immutable per-session node set, partitioned by category
#[derive(Clone, Debug, Default)]
pub struct NodeStore {
    /// One partition per category, in [`Category::ALL`] order, each sorted by id
    partitions: [Vec<Node>; 3],
    /// Geographic bounds (x = lon, y = lat), `None` if empty
    bounds: Option<Rect<f64>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl NodeStore {
    /// Build a store from an unordered node list
    pub fn new(nodes: Vec<Node>) -> Self {
        let mut partitions: [Vec<Node>; 3] = Default::default();
        for node in nodes {
            partitions[node.category.index()].push(node);
        }

        // Stable sort keeps duplicate ids in listing order
        partitions
            .par_iter_mut()
            .for_each(|partition| partition.par_sort_by_key(|node| node.id));

        let bounds = Self::compute_bounds(partitions.iter().flatten());

        tracing::debug!(
            "Built node store: {} places, {} bike stations, {} e-bike stations",
            partitions[0].len(),
            partitions[1].len(),
            partitions[2].len()
        );

        Self { partitions, bounds }
    }

    fn compute_bounds<'a>(nodes: impl Iterator<Item = &'a Node>) -> Option<Rect<f64>> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut any = false;

        for node in nodes {
            min_x = min_x.min(node.lon);
            min_y = min_y.min(node.lat);
            max_x = max_x.max(node.lon);
            max_y = max_y.max(node.lat);
            any = true;
        }

        any.then(|| {
            Rect::new(
                geo::Coord { x: min_x, y: min_y },
                geo::Coord { x: max_x, y: max_y },
            )
        })
    }

    /// Total number of nodes
    #[inline]
    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes in one category
    #[inline]
    pub fn count(&self, category: Category) -> usize {
        self.partitions[category.index()].len()
    }

    /// Nodes of one category, sorted by id
    #[inline]
    pub fn category(&self, category: Category) -> &[Node] {
        &self.partitions[category.index()]
    }

    /// All nodes in the fixed iteration order: places, bike stations, e-bike stations,
    /// each ascending by id
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.partitions.iter().flatten()
    }

    /// Look up a node by its identity
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        let partition = &self.partitions[key.category.index()];
        partition
            .binary_search_by_key(&key.id, |node| node.id)
            .ok()
            .map(|index| &partition[index])
    }

    /// Geographic bounding box of all nodes (x = lon, y = lat)
    #[inline]
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    /// Center of the bounding box, `None` if the store is empty
    pub fn center(&self) -> Option<LatLon> {
        self.bounds.map(|rect| {
            let center = rect.center();
            LatLon::new(center.y, center.x)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_nodes() -> Vec<Node> {
        vec![
            Node::new(7, 37.52, 127.02, Category::Place),
            Node::new(3, 37.50, 127.00, Category::BikeStation),
            Node::new(1, 37.51, 127.01, Category::Place),
            Node::new(1, 37.55, 127.05, Category::EBikeStation),
            Node::new(2, 37.49, 126.99, Category::BikeStation),
        ]
    }

    #[test]
    fn test_category_partition_counts() {
        let store = NodeStore::new(sample_nodes());
        let summed: usize = Category::ALL.iter().map(|&c| store.count(c)).sum();
        assert_eq!(summed, store.len());
        assert_eq!(store.len(), 5);
        assert_eq!(store.count(Category::Place), 2);
        assert_eq!(store.count(Category::BikeStation), 2);
        assert_eq!(store.count(Category::EBikeStation), 1);
    }

    #[test]
    fn test_each_node_in_exactly_one_partition() {
        let store = NodeStore::new(sample_nodes());
        for category in Category::ALL {
            assert!(store.category(category).iter().all(|n| n.category == category));
        }
    }

    #[test]
    fn test_iteration_order_is_category_then_id() {
        let store = NodeStore::new(sample_nodes());
        let keys: Vec<(Category, NodeId)> = store.iter().map(|n| (n.category, n.id)).collect();
        assert_eq!(
            keys,
            vec![
                (Category::Place, 1),
                (Category::Place, 7),
                (Category::BikeStation, 2),
                (Category::BikeStation, 3),
                (Category::EBikeStation, 1),
            ]
        );
    }

    #[test]
    fn test_same_id_different_category() {
        let store = NodeStore::new(sample_nodes());
        let place = store
            .get(NodeKey {
                category: Category::Place,
                id: 1,
            })
            .unwrap();
        let ebike = store
            .get(NodeKey {
                category: Category::EBikeStation,
                id: 1,
            })
            .unwrap();
        assert_ne!(place.position(), ebike.position());
        assert!(
            store
                .get(NodeKey {
                    category: Category::EBikeStation,
                    id: 2,
                })
                .is_none()
        );
    }

    #[test]
    fn test_bounds_and_center() {
        let store = NodeStore::new(sample_nodes());
        let bounds = store.bounds().unwrap();
        assert_eq!(bounds.min().y, 37.49);
        assert_eq!(bounds.max().x, 127.05);

        let center = store.center().unwrap();
        assert!((center.lat - 37.52).abs() < 1e-9);
        assert!((center.lon - 127.02).abs() < 1e-9);

        assert!(NodeStore::new(Vec::new()).bounds().is_none());
    }

    #[test]
    fn test_wire_names() {
        for category in Category::ALL {
            assert_eq!(Category::from_wire(category.wire_name()), category);
        }
        assert_eq!(Category::from_wire("bus_stop"), Category::Place);
        assert!(Category::BikeStation.is_station());
        assert!(!Category::Place.is_station());
    }
}
