//! In-memory routing service with scripted answers and latencies

use crate::nodes::{Category, Node, NodeKey};
use crate::plans::ModePlans;
use crate::service::{HealthStatus, RoutingService};
use crate::utils::LatLon;
use crate::{Result, RouteError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone)]
enum Answer {
    Path(Vec<LatLon>),
    Empty,
    Fail,
}

#[derive(Default)]
pub(crate) struct ScriptedService {
    nodes: Vec<Node>,
    segments: HashMap<(NodeKey, NodeKey), (Duration, Answer)>,
    plans: HashMap<(NodeKey, NodeKey), (Duration, Value)>,
    calls: Mutex<Vec<(NodeKey, NodeKey)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub(crate) fn place(id: i64, lat: f64, lon: f64) -> Node {
    Node::new(id, lat, lon, Category::Place)
}

pub(crate) fn bike(id: i64, lat: f64, lon: f64) -> Node {
    Node::new(id, lat, lon, Category::BikeStation)
}

pub(crate) fn ll(lat: f64, lon: f64) -> LatLon {
    LatLon::new(lat, lon)
}

impl ScriptedService {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }

    /// `from → to` answers `path` after `delay_ms`
    pub fn path(mut self, from: &Node, to: &Node, path: Vec<LatLon>, delay_ms: u64) -> Self {
        self.segments.insert(
            (from.key(), to.key()),
            (Duration::from_millis(delay_ms), Answer::Path(path)),
        );
        self
    }

    /// `from → to` answers with the straight line between the two nodes
    pub fn line(self, from: &Node, to: &Node, delay_ms: u64) -> Self {
        let path = vec![from.position(), to.position()];
        self.path(from, to, path, delay_ms)
    }

    /// `from → to` answers an empty coordinate list
    pub fn empty(mut self, from: &Node, to: &Node) -> Self {
        self.segments
            .insert((from.key(), to.key()), (Duration::ZERO, Answer::Empty));
        self
    }

    pub fn plans(mut self, from: &Node, to: &Node, body: Value, delay_ms: u64) -> Self {
        self.plans.insert(
            (from.key(), to.key()),
            (Duration::from_millis(delay_ms), body),
        );
        self
    }

    /// Segment requests in the order they were issued
    pub fn calls(&self) -> Vec<(NodeKey, NodeKey)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl RoutingService for ScriptedService {
    async fn fetch_nodes(&self) -> Result<Vec<Node>> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(self.nodes.clone())
    }

    async fn fetch_segment(&self, start: &Node, goal: &Node) -> Result<Vec<LatLon>> {
        let key = (start.key(), goal.key());
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key);
        }
        let (delay, answer) = self
            .segments
            .get(&key)
            .cloned()
            .unwrap_or((Duration::ZERO, Answer::Fail));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match answer {
            Answer::Path(path) => Ok(path),
            Answer::Empty => Ok(Vec::new()),
            Answer::Fail => Err(RouteError::Status { status: 500 }),
        }
    }

    async fn fetch_mode_plans(&self, start: &Node, goal: &Node) -> Result<ModePlans> {
        let (delay, body) = self
            .plans
            .get(&(start.key(), goal.key()))
            .cloned()
            .ok_or(RouteError::Status { status: 404 })?;
        tokio::time::sleep(delay).await;
        ModePlans::from_wire(&body)
    }

    async fn health(&self) -> Result<HealthStatus> {
        Ok(HealthStatus {
            status: "ok".to_string(),
            nodes_count: self.nodes.len() as u64,
            edges_count: 0,
        })
    }
}
