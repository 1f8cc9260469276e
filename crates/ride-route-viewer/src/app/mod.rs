//! Application module
//!
//! This module provides the main application structure:
//! - Full-screen map view with the node overlay
//! - Toggleable sidebar with the route stops, pinned node actions and mode plans
//! - Background node loading and route composition through the routing session

mod plugin;
pub(crate) mod settings;
mod state;
mod ui_panels;

use crate::app::plugin::{NodesPlugin, Overlay};
use crate::app::settings::Settings;
use crate::app::state::{Stats, StatusLine, Tiles, UiSettings};
use eframe::egui;
use ride_route_lib::{
    Canvas, HttpRoutingClient, MapEvent, NodesState, Outcome, PlanRequestState, RenderStyle,
    RoutingService, Session, SessionEvent, ViewportRenderer,
};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use walkers::{Map, MapMemory};

/// Capacity of the map event channel; a renderer that falls behind just redraws
const MAP_EVENT_CAPACITY: usize = 16;

/// Main application structure
pub struct RideRouteViewerApp {
    /// Stops, node set, composed route and mode plans
    session: Session<HttpRoutingClient>,

    /// Runtime UI toggles
    ui_settings: UiSettings,

    /// Map tiles, one cache per provider
    tiles: Tiles,

    /// Map state (camera position, zoom, etc.)
    map_memory: MapMemory,

    /// Renderer shared with the map plugin
    overlay: Arc<Mutex<Overlay>>,

    /// Map events fan out to the attached renderer
    map_events: broadcast::Sender<MapEvent>,

    /// Session revision the renderer last saw
    seen_revision: u64,

    /// Whether the view still has to be fitted to the loaded nodes
    pending_fit_bounds: bool,

    /// The initial zoom came from the command line and survives the first fit
    keep_initial_zoom: bool,

    stats: Stats,
    status: StatusLine,
}

impl RideRouteViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings) -> Result<Self, String> {
        let client = HttpRoutingClient::new(settings.client_config())
            .map_err(|err| format!("Failed to create routing client: {err}"))?;
        let mut session = Session::new(Arc::new(client), settings.config());
        tracing::info!("Using routing service at {}", session.service().config().base_url);

        let (map_events, _) = broadcast::channel(MAP_EVENT_CAPACITY);
        let mut renderer = ViewportRenderer::new(session.config().lod, RenderStyle::default());
        let ui_settings = UiSettings::new(&settings);
        if ui_settings.nodes_overlay {
            renderer.attach(Canvas::new(), &map_events);
        }

        let mut map_memory = MapMemory::default();
        let pending_fit_bounds = match (settings.center_lat, settings.center_lon) {
            (Some(lat), Some(lon)) => {
                map_memory.center_at(walkers::lat_lon(lat, lon));
                false
            }
            _ => true,
        };
        if let Some(zoom) = settings.zoom {
            let _ = map_memory.set_zoom(zoom);
        }

        check_health(session.service());
        session.load_nodes();

        Ok(Self {
            status: StatusLine::for_nodes(session.nodes_state()).unwrap_or_default(),
            seen_revision: session.revision(),
            session,
            ui_settings,
            tiles: Tiles::new(&cc.egui_ctx),
            map_memory,
            overlay: Arc::new(Mutex::new(Overlay::new(renderer))),
            map_events,
            pending_fit_bounds,
            keep_initial_zoom: settings.zoom.is_some(),
            stats: Stats::default(),
        })
    }

    /// Fit the map view to the bounding box of all loaded nodes
    fn fit_to_bounds(&mut self, keep_zoom: bool) {
        let Some(bounds) = self.session.nodes().bounds() else {
            return;
        };
        let (min, max) = (bounds.min(), bounds.max());
        let center = bounds.center();

        self.map_memory.center_at(walkers::lat_lon(center.y, center.x));

        if !keep_zoom {
            let max_span = (max.y - min.y).abs().max((max.x - min.x).abs());
            let zoom = if max_span > 0.0 {
                let zoom_estimate = (4.0 * 360.0 / max_span).log2();
                (zoom_estimate - 0.5).clamp(1.0, 18.0)
            } else {
                16.0
            };
            let _ = self.map_memory.set_zoom(zoom);
            tracing::debug!(
                "Auto-zoomed to bounds: ({:.4}, {:.4}) - ({:.4}, {:.4}), zoom: {:.1}",
                min.y,
                min.x,
                max.y,
                max.x,
                zoom
            );
        }
    }

    /// Attach or detach the node overlay to match the UI toggle, and push LOD edits
    fn sync_overlay_attachment(&mut self) {
        let Ok(mut overlay) = self.overlay.lock() else {
            return;
        };
        overlay.renderer.set_lod(self.ui_settings.lod);
        match (self.ui_settings.nodes_overlay, overlay.renderer.is_attached()) {
            (true, false) => {
                overlay.renderer.attach(Canvas::new(), &self.map_events);
            }
            (false, true) => {
                overlay.renderer.detach();
                self.stats.last_frame = Default::default();
            }
            _ => {}
        }
    }

    /// Commit finished background work and route UI notifications
    fn process_session(&mut self) {
        if let Ok(mut overlay) = self.overlay.lock() {
            if let Some(hit) = overlay.click.take() {
                self.session.node_clicked(hit);
            }
            if let Some((frame, elapsed_ms)) = overlay.frame.take() {
                self.stats.last_frame = frame;
                self.stats.last_frame_ms = elapsed_ms;
            }
            self.stats.frames_drawn = overlay.renderer.frames_drawn();
        }

        for outcome in self.session.poll() {
            match outcome {
                Outcome::PlansCommitted => {
                    if let PlanRequestState::Failed { message } = self.session.plan_state() {
                        self.status = StatusLine::error(format!("Mode plans failed: {message}"));
                        continue;
                    }
                }
                Outcome::NodesLoaded(_) if self.pending_fit_bounds => {
                    self.pending_fit_bounds = false;
                    self.fit_to_bounds(self.keep_initial_zoom);
                }
                _ => {}
            }
            if let Some(status) = StatusLine::for_outcome(&outcome) {
                self.status = status;
            }
        }

        for event in self.session.take_events() {
            match event {
                SessionEvent::NodeClicked(None) => tracing::debug!("Click missed every node"),
                SessionEvent::NodeClicked(Some(node)) => {
                    tracing::debug!("Clicked {:?} #{}", node.category, node.id)
                }
                SessionEvent::RouteRequested => {
                    self.status = StatusLine::info("Composing route…");
                }
                SessionEvent::PinnedChanged(_) | SessionEvent::ModeSelected(_) => {}
            }
        }

        // Anything the renderer draws changed: pinned node, stops, route, plans or nodes
        if self.session.revision() != self.seen_revision {
            self.seen_revision = self.session.revision();
            let _ = self.map_events.send(MapEvent::DataChanged);
        }
    }
}

/// Log what the routing service reports about itself, without blocking startup
fn check_health(service: &Arc<HttpRoutingClient>) {
    let service = Arc::clone(service);
    tokio::spawn(async move {
        match service.health().await {
            Ok(health) if health.is_ok() => tracing::info!(
                "Routing service healthy: {} nodes, {} edges",
                health.nodes_count,
                health.edges_count
            ),
            Ok(health) => tracing::warn!("Routing service reports status {:?}", health.status),
            Err(err) => tracing::warn!("Routing service health check failed: {err}"),
        }
    });
}

#[profiling::all_functions]
impl eframe::App for RideRouteViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_session();

        let actions = ui_panels::render_sidebar(
            ctx,
            &mut self.session,
            &mut self.ui_settings,
            &self.stats,
            &self.status,
        );
        if actions.fit_to_nodes {
            self.fit_to_bounds(false);
        }
        self.sync_overlay_attachment();

        let scene = self.session.scene();
        let hit_threshold_px = self.session.config().hit_threshold_px;
        let overlay = Arc::clone(&self.overlay);
        let map_events = self.map_events.clone();
        let tiles_provider = self.ui_settings.tiles_provider;
        let attribution_text = tiles_provider.attribution();

        // Central panel: Map view (full screen)
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                profiling::scope!("map_panel");

                let plugin = NodesPlugin::new(overlay, map_events, scene, hit_threshold_px);
                let map = Map::new(
                    Some(self.tiles.get(tiles_provider)),
                    &mut self.map_memory,
                    walkers::lat_lon(0.0, 0.0),
                )
                .with_plugin(plugin);

                ui.add(map);

                ui_panels::sidebar_toggle_button(ui, &mut self.ui_settings);

                let painter = ui.painter();
                let screen_rect = ui.max_rect();
                painter.text(
                    screen_rect.center_bottom() + egui::vec2(0.0, -5.0),
                    egui::Align2::CENTER_BOTTOM,
                    attribution_text,
                    egui::FontId::proportional(10.0),
                    egui::Color32::from_black_alpha(180),
                );
            });

        // Keep polling while background work is in flight
        if self.session.is_composing()
            || matches!(self.session.plan_state(), PlanRequestState::Pending { .. })
            || matches!(self.session.nodes_state(), NodesState::Loading)
        {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        }
    }

    fn on_exit(&mut self) {
        if let Ok(mut overlay) = self.overlay.lock() {
            overlay.renderer.detach();
        }
        tracing::info!("Shutting down");
    }
}
