//! Session coordinator
//!
//! The session is the only owner of mutable map state: the node set, the user's selection,
//! the composed route and the plan set. Network work is spawned onto the tokio runtime and
//! reports back over a channel; results are applied in [`Session::poll`] or
//! [`Session::next_outcome`], and only while the [`GuardToken`] they were issued under is
//! still current. Superseded tasks are left to finish and their results are dropped.
//!
//! Spawning methods must be called from within a tokio runtime.

use crate::composer::RouteComposer;
use crate::config::Config;
use crate::nodes::{Category, Node, NodeKey, NodeStore};
use crate::plans::{ModePlanSelector, ModePlans, PlanRequestState};
use crate::renderer::{Overlay, Scene};
use crate::route::{ComposedRoute, TransportMode};
use crate::selection::{GuardToken, Selection};
use crate::service::RoutingService;
use crate::spatial::SpatialQuery;
use crate::viewport::{MapTransform, Pixel};
use crate::{Result, SelectError};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Progress of the one-off node listing fetch
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum NodesState {
    #[default]
    NotLoaded,
    Loading,
    Loaded(usize),
    Failed(String),
}

/// Notifications for the surrounding UI, drained with [`Session::take_events`]
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A click resolved to this node, or to nothing
    NodeClicked(Option<Node>),
    PinnedChanged(Option<NodeKey>),
    /// A route composition was started
    RouteRequested,
    ModeSelected(Option<TransportMode>),
}

/// What applying one finished task did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    NodesLoaded(usize),
    NodesFailed(String),
    RouteCommitted,
    PlansCommitted,
    /// The result belonged to a superseded request and was dropped
    Stale,
}

enum Message {
    Nodes(Result<Vec<Node>>),
    Route {
        token: GuardToken,
        request: u64,
        route: Option<ComposedRoute>,
    },
    Plans {
        token: GuardToken,
        request: u64,
        result: Result<ModePlans>,
    },
}

pub struct Session<R> {
    config: Config,
    service: Arc<R>,
    composer: RouteComposer<R>,
    nodes: Arc<NodeStore>,
    nodes_state: NodesState,
    selection: Selection,
    route: Option<Arc<ComposedRoute>>,
    route_request: u64,
    composing: bool,
    plans: ModePlanSelector,
    revision: u64,
    sender: mpsc::UnboundedSender<Message>,
    receiver: mpsc::UnboundedReceiver<Message>,
    events: VecDeque<SessionEvent>,
}

impl<R: RoutingService> Session<R> {
    pub fn new(service: Arc<R>, config: Config) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            config,
            composer: RouteComposer::new(Arc::clone(&service)),
            service,
            nodes: Arc::new(NodeStore::default()),
            nodes_state: NodesState::default(),
            selection: Selection::default(),
            route: None,
            route_request: 0,
            composing: false,
            plans: ModePlanSelector::new(),
            revision: 0,
            sender,
            receiver,
            events: VecDeque::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn service(&self) -> &Arc<R> {
        &self.service
    }

    #[inline]
    pub fn nodes(&self) -> &Arc<NodeStore> {
        &self.nodes
    }

    #[inline]
    pub fn nodes_state(&self) -> &NodesState {
        &self.nodes_state
    }

    #[inline]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[inline]
    pub fn route(&self) -> Option<&Arc<ComposedRoute>> {
        self.route.as_ref()
    }

    #[inline]
    pub fn is_composing(&self) -> bool {
        self.composing
    }

    #[inline]
    pub fn plan_state(&self) -> &PlanRequestState {
        self.plans.state()
    }

    /// Bumped on every change that affects what is drawn
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Station category used for the ride leg of composed routes
    #[inline]
    pub fn ride_category(&self) -> Category {
        self.config.default_ride_category
    }

    /// Fetch the node listing in the background
    pub fn load_nodes(&mut self) {
        self.nodes_state = NodesState::Loading;
        let service = Arc::clone(&self.service);
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = service.fetch_nodes().await;
            let _ = sender.send(Message::Nodes(result));
        });
    }

    /// Replace the node set
    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        let store = NodeStore::new(nodes);
        tracing::info!("Loaded {} nodes", store.len());
        self.nodes_state = NodesState::Loaded(store.len());
        self.nodes = Arc::new(store);
        self.touch();
    }

    /// Resolve a click at `pixel` and pin the hit node. Returns the hit.
    pub fn click(&mut self, transform: &dyn MapTransform, pixel: Pixel) -> Option<Node> {
        let hit = SpatialQuery::new(&self.nodes)
            .nearest_to_pixel(transform, pixel, self.config.hit_threshold_px)
            .copied();
        self.node_clicked(hit);
        hit
    }

    /// Record a click result: the hit node becomes the pinned node, a miss clears it
    pub fn node_clicked(&mut self, node: Option<Node>) {
        self.events.push_back(SessionEvent::NodeClicked(node));
        if self.selection.set_pinned(node) {
            self.events
                .push_back(SessionEvent::PinnedChanged(node.map(|n| n.key())));
            self.touch();
        }
    }

    pub fn set_start(&mut self, node: Option<Node>) {
        if self.selection.set_start(node) {
            self.endpoints_changed();
        }
    }

    pub fn set_dest(&mut self, node: Option<Node>) {
        if self.selection.set_dest(node) {
            self.endpoints_changed();
        }
    }

    pub fn swap_endpoints(&mut self) {
        self.selection.swap_endpoints();
        self.endpoints_changed();
    }

    pub fn add_via(&mut self, node: Node) {
        self.selection.push_via(node);
        self.discard_plans();
        self.stops_changed();
    }

    pub fn remove_via(&mut self, index: usize) -> Option<Node> {
        let removed = self.selection.remove_via(index);
        if removed.is_some() {
            self.discard_plans();
            self.stops_changed();
        }
        removed
    }

    /// Forget start, destination, via stops, route and plans
    pub fn clear_route(&mut self) {
        self.selection.clear_route();
        self.plans.reset();
        self.route = None;
        self.composing = false;
        self.touch();
    }

    fn endpoints_changed(&mut self) {
        self.discard_plans();
        self.stops_changed();
    }

    /// Plans describe the previous stops; drop them so the overlay falls back to the route
    fn discard_plans(&mut self) {
        if self.plans.state() != &PlanRequestState::NotRequested {
            tracing::debug!("Stops changed, discarding mode plans");
        }
        self.plans.reset();
        if self.selection.active_mode().is_some() {
            self.selection.set_active_mode(None);
            self.events.push_back(SessionEvent::ModeSelected(None));
        }
    }

    fn stops_changed(&mut self) {
        self.route = None;
        self.composing = false;
        self.touch();
        if self.config.auto_compose {
            self.request_route();
        }
    }

    /// Compose a route for the current stops in the background. Returns the request id,
    /// or `None` when start or destination is unset.
    pub fn request_route(&mut self) -> Option<u64> {
        let stops = self.selection.stops()?;

        self.route_request += 1;
        let request = self.route_request;
        let token = self.selection.token();
        let ride = self.ride_category();
        let composer = self.composer.clone();
        let nodes = Arc::clone(&self.nodes);
        let sender = self.sender.clone();

        tracing::debug!(
            "Route request #{request}: {} stops, ride {:?}",
            stops.len(),
            ride
        );
        tokio::spawn(async move {
            let route = composer.compose(&nodes, &stops, ride).await;
            let _ = sender.send(Message::Route {
                token,
                request,
                route,
            });
        });

        self.composing = true;
        self.events.push_back(SessionEvent::RouteRequested);
        Some(request)
    }

    /// Fetch one plan per transport mode for the current start and destination.
    /// Returns `false` when either is unset.
    pub fn request_mode_plans(&mut self) -> bool {
        let (Some(start), Some(dest)) = (
            self.selection.start().copied(),
            self.selection.dest().copied(),
        ) else {
            return false;
        };

        let token = self.selection.token();
        let request = self.plans.begin_request(token);
        let service = Arc::clone(&self.service);
        let sender = self.sender.clone();

        tracing::debug!("Mode plan request #{request}: {} → {}", start.id, dest.id);
        tokio::spawn(async move {
            let result = service.fetch_mode_plans(&start, &dest).await;
            let _ = sender.send(Message::Plans {
                token,
                request,
                result,
            });
        });

        self.touch();
        true
    }

    /// Make `mode` the active plan
    pub fn select_mode(&mut self, mode: TransportMode) -> std::result::Result<(), SelectError> {
        self.plans.validate_select(mode)?;
        if self.selection.active_mode() != Some(mode) {
            self.selection.set_active_mode(Some(mode));
            self.events.push_back(SessionEvent::ModeSelected(Some(mode)));
            self.touch();
        }
        Ok(())
    }

    /// Apply every finished task without blocking. Call once per UI frame.
    pub fn poll(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            outcomes.push(self.apply(message));
        }
        outcomes
    }

    /// Wait for the next finished task and apply it
    pub async fn next_outcome(&mut self) -> Option<Outcome> {
        let message = self.receiver.recv().await?;
        Some(self.apply(message))
    }

    fn apply(&mut self, message: Message) -> Outcome {
        match message {
            Message::Nodes(Ok(nodes)) => {
                self.set_nodes(nodes);
                Outcome::NodesLoaded(self.nodes.len())
            }
            Message::Nodes(Err(err)) => {
                tracing::warn!("Failed to load nodes: {err}");
                self.nodes_state = NodesState::Failed(err.to_string());
                self.touch();
                Outcome::NodesFailed(err.to_string())
            }
            Message::Route {
                token,
                request,
                route,
            } => {
                if !self.selection.is_current(token) || request != self.route_request {
                    tracing::debug!("Dropping stale route #{request}");
                    return Outcome::Stale;
                }
                self.route = route.map(Arc::new);
                self.composing = false;
                self.touch();
                Outcome::RouteCommitted
            }
            Message::Plans {
                token,
                request,
                result,
            } => {
                if !self.plans.complete(token, request, result) {
                    return Outcome::Stale;
                }
                let mode = self.plans.default_mode();
                self.selection.set_active_mode(mode);
                self.events.push_back(SessionEvent::ModeSelected(mode));
                self.touch();
                Outcome::PlansCommitted
            }
        }
    }

    /// Drain queued UI notifications
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    /// Snapshot for the renderer: plans take over the overlay once they are ready
    pub fn scene(&self) -> Scene {
        let overlay = match (self.plans.plans(), &self.route) {
            (Some(plans), _) => Overlay::Plans {
                plans: Arc::clone(plans),
                active: self.selection.active_mode(),
            },
            (None, Some(route)) => Overlay::Route(Arc::clone(route)),
            (None, None) => Overlay::None,
        };
        Scene {
            nodes: Arc::clone(&self.nodes),
            priority: self.selection.priority(),
            pinned: self.selection.pinned().map(Node::key),
            overlay,
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Fallback;
    use crate::testing::{ScriptedService, bike, ll, place};
    use crate::utils::LatLon;
    use crate::viewport::Viewport;
    use serde_json::json;

    fn places() -> [Node; 4] {
        [
            place(1, 37.500, 127.000),
            place(2, 37.510, 127.010),
            place(3, 37.520, 127.020),
            place(4, 37.530, 127.030),
        ]
    }

    fn session_with(service: ScriptedService, nodes: Vec<Node>) -> Session<ScriptedService> {
        let mut session = Session::new(Arc::new(service), Config::default());
        session.set_nodes(nodes);
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_nodes() {
        let [a, b, ..] = places();
        let service = ScriptedService::new(vec![a, b, bike(7, 37.505, 127.005)]);
        let mut session = Session::new(Arc::new(service), Config::default());
        assert_eq!(session.nodes_state(), &NodesState::NotLoaded);

        session.load_nodes();
        assert_eq!(session.nodes_state(), &NodesState::Loading);
        assert_eq!(session.next_outcome().await, Some(Outcome::NodesLoaded(3)));
        assert_eq!(session.nodes_state(), &NodesState::Loaded(3));
        assert_eq!(session.nodes().count(Category::BikeStation), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_route_is_discarded() {
        let [a, b, c, d] = places();
        // No stations in the store, so every composition is a direct fetch
        let r1 = vec![ll(37.500, 127.000), ll(37.505, 127.001), ll(37.510, 127.010)];
        let r2 = vec![ll(37.520, 127.020), ll(37.525, 127.021), ll(37.530, 127.030)];
        let service = ScriptedService::new(Vec::new())
            .path(&a, &b, r1, 300)
            .path(&c, &d, r2.clone(), 50);
        let mut session = session_with(service, vec![a, b, c, d]);

        session.set_start(Some(a));
        session.set_dest(Some(b));
        assert!(session.is_composing());

        session.set_start(Some(c));
        session.set_dest(Some(d));

        let mut outcomes = Vec::new();
        for _ in 0..3 {
            outcomes.push(session.next_outcome().await.unwrap());
        }
        assert_eq!(
            outcomes,
            vec![Outcome::Stale, Outcome::RouteCommitted, Outcome::Stale]
        );

        let route = session.route().unwrap();
        assert_eq!(route.coordinates(), r2.as_slice());
        assert_eq!(route.fallback(), Fallback::Direct);
        assert!(!session.is_composing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_manual_request_commits() {
        let [a, b, ..] = places();
        let service = ScriptedService::new(Vec::new()).line(&a, &b, 20);
        let config = Config {
            auto_compose: false,
            ..Config::default()
        };
        let mut session = Session::new(Arc::new(service), config);
        session.set_nodes(vec![a, b]);

        assert!(session.request_route().is_none());
        session.set_start(Some(a));
        session.set_dest(Some(b));
        assert!(!session.is_composing());

        let first = session.request_route().unwrap();
        let second = session.request_route().unwrap();
        assert!(second > first);

        // Both finish at the same instant; whichever lands first, only one commits
        let mut outcomes = vec![
            session.next_outcome().await.unwrap(),
            session.next_outcome().await.unwrap(),
        ];
        outcomes.retain(|o| *o == Outcome::RouteCommitted);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(session.route().unwrap().len(), 2);

        let requested = session
            .take_events()
            .into_iter()
            .filter(|e| *e == SessionEvent::RouteRequested)
            .count();
        assert_eq!(requested, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_via_change_supersedes_route() {
        let [a, b, c, _] = places();
        let service = ScriptedService::new(Vec::new())
            .line(&a, &c, 100)
            .line(&a, &b, 10)
            .line(&b, &c, 10);
        let mut session = session_with(service, vec![a, b, c]);

        session.set_start(Some(a));
        session.set_dest(Some(c));
        session.add_via(b);

        let mut committed = None;
        while committed.is_none() {
            if session.next_outcome().await == Some(Outcome::RouteCommitted) {
                committed = session.route().cloned();
            }
        }
        let route = committed.unwrap();
        assert_eq!(route.coordinates(), &[a.position(), b.position(), c.position()]);

        // The slow direct a→c result arrives later and is dropped
        assert_eq!(session.next_outcome().await, Some(Outcome::Stale));
        assert_eq!(session.route().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_plans_default_and_select() {
        let [a, b, c, _] = places();
        let body = json!({
            "walk": { "success": false, "message": "too far" },
            "bike": { "success": true, "time_min": 12, "segments": [] },
            "ebike": { "success": true, "time_min": 9, "segments": [] }
        });
        let service = ScriptedService::new(Vec::new()).plans(&a, &b, body, 40);
        let mut session = session_with(service, vec![a, b, c]);
        session.set_start(Some(a));
        session.set_dest(Some(b));
        session.take_events();

        assert_eq!(session.select_mode(TransportMode::Bike), Err(SelectError::NotReady));
        assert!(session.request_mode_plans());

        loop {
            if session.next_outcome().await == Some(Outcome::PlansCommitted) {
                break;
            }
        }
        assert_eq!(session.selection().active_mode(), Some(TransportMode::Bike));
        assert!(matches!(session.scene().overlay, Overlay::Plans { .. }));
        assert_eq!(
            session.select_mode(TransportMode::Walk),
            Err(SelectError::ModeUnavailable(TransportMode::Walk))
        );

        session.select_mode(TransportMode::EBike).unwrap();
        // The mode choice only picks which plan is highlighted
        assert_eq!(session.ride_category(), Category::BikeStation);
        let events = session.take_events();
        assert!(events.contains(&SessionEvent::ModeSelected(Some(TransportMode::Bike))));
        assert_eq!(
            events.last(),
            Some(&SessionEvent::ModeSelected(Some(TransportMode::EBike)))
        );

        // Changing the destination resets the plans and the active mode
        session.set_dest(Some(c));
        assert_eq!(session.plan_state(), &PlanRequestState::NotRequested);
        assert_eq!(session.selection().active_mode(), None);
        assert_eq!(session.ride_category(), Category::BikeStation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_via_change_after_plans_shows_route() {
        let [a, b, c, _] = places();
        let body = json!({
            "bike": { "success": true, "time_min": 12, "segments": [] },
            "ebike": { "success": true, "time_min": 9, "segments": [] }
        });
        let service = ScriptedService::new(Vec::new())
            .line(&a, &b, 10)
            .plans(&a, &b, body, 20)
            .line(&a, &c, 10)
            .line(&c, &b, 10);
        let mut session = session_with(service, vec![a, b, c]);
        session.set_start(Some(a));
        session.set_dest(Some(b));
        assert!(session.request_mode_plans());

        loop {
            if session.next_outcome().await == Some(Outcome::PlansCommitted) {
                break;
            }
        }
        session.select_mode(TransportMode::EBike).unwrap();
        assert!(matches!(session.scene().overlay, Overlay::Plans { .. }));
        session.take_events();

        session.add_via(c);
        assert_eq!(session.plan_state(), &PlanRequestState::NotRequested);
        assert_eq!(session.selection().active_mode(), None);
        assert!(session.take_events().contains(&SessionEvent::ModeSelected(None)));

        loop {
            if session.next_outcome().await == Some(Outcome::RouteCommitted) {
                break;
            }
        }
        match session.scene().overlay {
            Overlay::Route(route) => {
                assert_eq!(route.coordinates(), &[a.position(), c.position(), b.position()]);
            }
            _ => panic!("expected the via route in the overlay"),
        }

        // Removing the via stop also keeps the plans cleared
        assert_eq!(session.remove_via(0), Some(c));
        assert_eq!(session.plan_state(), &PlanRequestState::NotRequested);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plans_for_old_endpoints_are_dropped() {
        let [a, b, c, _] = places();
        let body = json!({ "walk": { "success": true, "time_min": 30 } });
        let service = ScriptedService::new(Vec::new()).plans(&a, &b, body, 100);
        let config = Config {
            auto_compose: false,
            ..Config::default()
        };
        let mut session = Session::new(Arc::new(service), config);
        session.set_nodes(vec![a, b, c]);
        session.set_start(Some(a));
        session.set_dest(Some(b));

        assert!(session.request_mode_plans());
        session.set_dest(Some(c));

        assert_eq!(session.next_outcome().await, Some(Outcome::Stale));
        assert_eq!(session.plan_state(), &PlanRequestState::NotRequested);
        assert_eq!(session.selection().active_mode(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_pins_node() {
        let station = bike(2, 37.51, 127.01);
        let nodes = vec![place(1, 37.50, 127.00), station];
        let mut session = session_with(ScriptedService::new(Vec::new()), nodes);
        let view = Viewport::new(LatLon::new(37.505, 127.005), 15.0, (800.0, 600.0));

        let click = view.project(station.position()).offset(3.0, 4.0);
        assert_eq!(session.click(&view, click), Some(station));
        assert_eq!(session.scene().pinned, Some(station.key()));
        assert_eq!(
            session.take_events(),
            vec![
                SessionEvent::NodeClicked(Some(station)),
                SessionEvent::PinnedChanged(Some(station.key())),
            ]
        );

        // Same node again: clicked, but the pin does not change
        session.click(&view, click);
        assert_eq!(
            session.take_events(),
            vec![SessionEvent::NodeClicked(Some(station))]
        );

        assert_eq!(session.click(&view, Pixel::new(5.0, 5.0)), None);
        assert_eq!(
            session.take_events(),
            vec![SessionEvent::NodeClicked(None), SessionEvent::PinnedChanged(None)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scene_reflects_selection_and_route() {
        let [a, b, ..] = places();
        let service = ScriptedService::new(Vec::new()).line(&a, &b, 10);
        let mut session = session_with(service, vec![a, b]);
        let before = session.revision();

        session.set_start(Some(a));
        session.set_dest(Some(b));
        assert!(session.revision() > before);

        let scene = session.scene();
        assert!(scene.priority.contains(a.key()));
        assert!(scene.priority.contains(b.key()));
        assert!(matches!(scene.overlay, Overlay::None));

        assert_eq!(session.next_outcome().await, Some(Outcome::RouteCommitted));
        assert!(matches!(session.scene().overlay, Overlay::Route(_)));

        session.clear_route();
        assert!(session.route().is_none());
        assert!(session.scene().priority.is_empty());
    }
}
