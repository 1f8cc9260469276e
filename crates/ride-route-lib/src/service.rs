//! The request/response interface to the external routing service

use crate::Result;
use crate::nodes::{Category, Node, NodeId};
use crate::plans::ModePlans;
use crate::utils::LatLon;
use serde::{Deserialize, Deserializer, Serialize};
use std::future::Future;

/// A routing backend: node listing, single-segment paths and per-mode plans
pub trait RoutingService: Send + Sync + 'static {
    /// Fetch the full node listing, once per session
    fn fetch_nodes(&self) -> impl Future<Output = Result<Vec<Node>>> + Send;

    /// Path coordinates from `start` to `goal`. An `Ok` result is never empty.
    fn fetch_segment(
        &self,
        start: &Node,
        goal: &Node,
    ) -> impl Future<Output = Result<Vec<LatLon>>> + Send;

    /// One plan per transport mode between `start` and `goal`
    fn fetch_mode_plans(
        &self,
        start: &Node,
        goal: &Node,
    ) -> impl Future<Output = Result<ModePlans>> + Send;

    /// Service liveness and graph size
    fn health(&self) -> impl Future<Output = Result<HealthStatus>> + Send;
}

/// Body of the path and plan requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathRequest {
    pub start_id: NodeId,
    pub goal_id: NodeId,
}

impl PathRequest {
    pub fn between(start: &Node, goal: &Node) -> Self {
        Self {
            start_id: start.id,
            goal_id: goal.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub nodes_count: u64,
    #[serde(default)]
    pub edges_count: u64,
}

impl HealthStatus {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// One entry of the node listing
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NodeRecord {
    #[serde(deserialize_with = "numeric_id")]
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl NodeRecord {
    pub fn into_node(self) -> Node {
        let category = self
            .kind
            .as_deref()
            .map_or(Category::Place, Category::from_wire);
        Node::new(self.id, self.lat, self.lon, category)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeListing {
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub count: Option<usize>,
}

/// Ids arrive as numbers, or as numeric strings from some exports
fn numeric_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<NodeId, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(NodeId),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(id) => Ok(id),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_listing_decodes() {
        let json = r#"{
            "nodes": [
                { "id": 1, "lat": 37.50, "lon": 127.00, "type": "traffic" },
                { "id": "2", "lat": 37.51, "lon": 127.01, "type": "bicycle_station" },
                { "id": 2, "lat": 37.52, "lon": 127.02, "type": "e_bicycle_station" },
                { "id": 3, "lat": 37.53, "lon": 127.03 }
            ],
            "count": 4
        }"#;
        let listing: NodeListing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.count, Some(4));

        let nodes: Vec<Node> = listing.nodes.into_iter().map(NodeRecord::into_node).collect();
        assert_eq!(nodes[1].id, 2);
        assert_eq!(nodes[1].category, Category::BikeStation);
        assert_eq!(nodes[2].category, Category::EBikeStation);
        assert_eq!(nodes[3].category, Category::Place);
    }

    #[test]
    fn test_bad_id_is_rejected() {
        let json = r#"{ "id": "abc", "lat": 1.0, "lon": 2.0 }"#;
        assert!(serde_json::from_str::<NodeRecord>(json).is_err());
    }

    #[test]
    fn test_path_request_body() {
        let start = Node::new(10, 0.0, 0.0, Category::Place);
        let goal = Node::new(20, 0.0, 0.0, Category::BikeStation);
        let body = serde_json::to_value(PathRequest::between(&start, &goal)).unwrap();
        assert_eq!(body, serde_json::json!({ "start_id": 10, "goal_id": 20 }));
    }

    #[test]
    fn test_health_status() {
        let health: HealthStatus =
            serde_json::from_str(r#"{ "status": "ok", "nodes_count": 12, "edges_count": 30 }"#).unwrap();
        assert!(health.is_ok());
        assert_eq!(health.edges_count, 30);
    }
}
