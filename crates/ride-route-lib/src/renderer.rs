//! Viewport-synchronized point renderer
//!
//! The renderer is an owned resource with an explicit lifecycle:
//!
//! - [`ViewportRenderer::attach`] takes a surface and subscribes to the map's event channel
//! - [`ViewportRenderer::detach`] drops the subscription and hands the surface back
//! - dropping the renderer detaches, so no exit path can leave a live subscription
//!
//! Redraws are single-slot: any number of map events between two frames schedule exactly
//! one redraw. The owner calls [`ViewportRenderer::render_frame`] once per display frame
//! with the current transform and a [`Scene`] snapshot; all drawing happens inside it.

use crate::declutter::{DeclutterGrid, LodConfig};
use crate::nodes::{Category, NodeKey, NodeStore};
use crate::plans::ModePlans;
use crate::route::{ComposedRoute, TransportMode};
use crate::selection::{PrioritySet, Role};
use crate::surface::{PathStyle, PointStyle, RenderSurface, Rgba};
use crate::utils::LatLon;
use crate::viewport::{MapTransform, Pixel};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Something happened to the map or the data drawn on it
#[derive(Clone, Debug, PartialEq)]
pub enum MapEvent {
    /// The user stopped dragging the map
    PanEnded,
    ZoomChanged(f64),
    /// New surface size in pixels
    Resized(f32, f32),
    /// Nodes, selection, route or plans changed
    DataChanged,
}

/// Route overlay drawn above the nodes
#[derive(Clone, Debug, Default)]
pub enum Overlay {
    #[default]
    None,
    Route(Arc<ComposedRoute>),
    /// Every successful plan, the active one emphasized
    Plans {
        plans: Arc<ModePlans>,
        active: Option<TransportMode>,
    },
}

/// Read-only snapshot of what to draw
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub nodes: Arc<NodeStore>,
    pub priority: PrioritySet,
    pub pinned: Option<NodeKey>,
    pub overlay: Overlay,
}

/// Colors and sizes for every kind of mark
#[derive(Clone, Debug, PartialEq)]
pub struct RenderStyle {
    pub place: PointStyle,
    pub bike_station: PointStyle,
    pub ebike_station: PointStyle,
    pub start: PointStyle,
    pub destination: PointStyle,
    pub via: PointStyle,
    /// Ring drawn around the pinned node
    pub pinned: PointStyle,
    pub route: PathStyle,
    pub walk: Rgba,
    pub bike: Rgba,
    pub ebike: Rgba,
    pub plan_width: f32,
    /// Alpha applied to successful plans that are not the active one
    pub inactive_alpha: u8,
    /// Nodes projected this far outside the surface are still drawn
    pub cull_margin_px: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        let white = Rgba::rgb(255, 255, 255);
        Self {
            place: PointStyle::filled(1.5, Rgba::rgb(0, 0, 255)),
            bike_station: PointStyle::filled(2.5, Rgba::rgb(255, 0, 0)),
            ebike_station: PointStyle::filled(2.5, Rgba::rgb(156, 39, 176)),
            start: PointStyle::filled(6.0, Rgba::rgb(46, 125, 50)).outlined(2.0, white),
            destination: PointStyle::filled(6.0, Rgba::rgb(198, 40, 40)).outlined(2.0, white),
            via: PointStyle::filled(5.0, Rgba::rgb(239, 108, 0)).outlined(1.5, white),
            pinned: PointStyle::filled(8.0, Rgba::rgb(255, 235, 59).with_alpha(90))
                .outlined(2.0, Rgba::rgb(255, 193, 7)),
            route: PathStyle {
                width: 4.0,
                color: Rgba::rgb(30, 136, 229),
            },
            walk: Rgba::rgb(76, 175, 80),
            bike: Rgba::rgb(255, 152, 0),
            ebike: Rgba::rgb(156, 39, 176),
            plan_width: 5.0,
            inactive_alpha: 90,
            cull_margin_px: 10.0,
        }
    }
}

impl RenderStyle {
    pub fn for_category(&self, category: Category) -> PointStyle {
        match category {
            Category::Place => self.place,
            Category::BikeStation => self.bike_station,
            Category::EBikeStation => self.ebike_station,
        }
    }

    pub fn for_role(&self, role: Role) -> PointStyle {
        match role {
            Role::Start => self.start,
            Role::Destination => self.destination,
            Role::Via(_) => self.via,
        }
    }

    pub fn for_transport(&self, transport: TransportMode) -> Rgba {
        match transport {
            TransportMode::Walk => self.walk,
            TransportMode::Bike => self.bike,
            TransportMode::EBike => self.ebike,
        }
    }
}

/// What the last frame did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub nodes_drawn: usize,
    /// Place nodes hidden by the LOD policy
    pub nodes_decluttered: usize,
    /// Nodes outside the surface
    pub nodes_culled: usize,
    pub overlay_points: usize,
    pub claimed_cells: usize,
}

pub struct ViewportRenderer<S: RenderSurface> {
    lod: LodConfig,
    style: RenderStyle,
    surface: Option<S>,
    events: Option<broadcast::Receiver<MapEvent>>,
    pending: bool,
    frames: u64,
}

impl<S: RenderSurface> ViewportRenderer<S> {
    pub fn new(lod: LodConfig, style: RenderStyle) -> Self {
        Self {
            lod,
            style,
            surface: None,
            events: None,
            pending: false,
            frames: 0,
        }
    }

    /// Take ownership of `surface` and start listening to `events`. A first frame is
    /// scheduled right away. Returns the previously attached surface, if any.
    pub fn attach(&mut self, surface: S, events: &broadcast::Sender<MapEvent>) -> Option<S> {
        let previous = self.detach();
        self.surface = Some(surface);
        self.events = Some(events.subscribe());
        self.pending = true;
        tracing::info!("Node overlay attached");
        previous
    }

    /// Unsubscribe, cancel any pending frame and hand the surface back
    pub fn detach(&mut self) -> Option<S> {
        self.events = None;
        self.pending = false;
        let surface = self.surface.take();
        if surface.is_some() {
            tracing::info!("Node overlay detached after {} frames", self.frames);
        }
        surface
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    #[inline]
    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    #[inline]
    pub fn is_frame_pending(&self) -> bool {
        self.pending
    }

    #[inline]
    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    #[inline]
    pub fn lod(&self) -> &LodConfig {
        &self.lod
    }

    pub fn set_lod(&mut self, lod: LodConfig) {
        if self.lod != lod {
            self.lod = lod;
            self.request_redraw();
        }
    }

    #[inline]
    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Schedule a redraw. Returns `false` when one is already pending or nothing is
    /// attached.
    pub fn request_redraw(&mut self) -> bool {
        if !self.is_attached() || self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    /// Drain map events received since the last call. Returns how many were handled.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let Some(events) = self.events.as_mut() else {
                break;
            };
            match events.try_recv() {
                Ok(event) => {
                    handled += 1;
                    self.handle_event(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("Missed {skipped} map events, redrawing");
                    self.request_redraw();
                }
                Err(TryRecvError::Closed) => {
                    tracing::warn!("Map event channel closed");
                    self.events = None;
                    break;
                }
            }
        }
        handled
    }

    fn handle_event(&mut self, event: MapEvent) {
        if let MapEvent::Resized(width, height) = event
            && let Some(surface) = self.surface.as_mut()
        {
            surface.resize(width, height);
        }
        self.request_redraw();
    }

    /// Draw the scene if a frame is pending. Returns `None` when nothing was drawn.
    pub fn render_frame(&mut self, transform: &dyn MapTransform, scene: &Scene) -> Option<FrameStats> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        let surface = self.surface.as_mut()?;

        profiling::scope!("ViewportRenderer::render_frame");

        let (width, height) = transform.size();
        surface.resize(width, height);
        let center = transform.center();
        surface.set_anchor(center, transform.project(center));
        surface.clear();

        let style = &self.style;
        let mut stats = FrameStats::default();
        let mut grid = DeclutterGrid::begin_frame(self.lod, transform.zoom());
        let mut markers: Vec<(Pixel, PointStyle)> = Vec::new();

        {
            profiling::scope!("nodes");
            for node in scene.nodes.iter() {
                let pixel = transform.project(node.position());
                if !transform.contains(pixel, style.cull_margin_px) {
                    stats.nodes_culled += 1;
                    continue;
                }

                let key = node.key();
                let role = scene.priority.role(key);
                if !grid.admit(node.category, role.is_some(), pixel) {
                    stats.nodes_decluttered += 1;
                    continue;
                }

                stats.nodes_drawn += 1;
                match role {
                    Some(role) => markers.push((pixel, style.for_role(role))),
                    None => surface.fill_point(pixel, style.for_category(node.category)),
                }
            }
        }

        // The pin ring is drawn even when the grid hides the pinned node itself
        if let Some(pinned) = scene.pinned.and_then(|key| scene.nodes.get(key)) {
            let pixel = transform.project(pinned.position());
            if transform.contains(pixel, style.cull_margin_px) {
                markers.push((pixel, style.pinned));
            }
        }

        stats.overlay_points = match &scene.overlay {
            Overlay::None => 0,
            Overlay::Route(route) => {
                draw_path(surface, transform, route.coordinates(), style.route)
            }
            Overlay::Plans { plans, active } => draw_plans(surface, transform, style, plans, *active),
        };

        for (pixel, point_style) in markers {
            surface.fill_point(pixel, point_style);
        }

        stats.claimed_cells = grid.claimed_cells();
        self.frames += 1;
        tracing::trace!("Frame {}: {stats:?}", self.frames);
        Some(stats)
    }
}

impl<S: RenderSurface> Drop for ViewportRenderer<S> {
    fn drop(&mut self) {
        self.detach();
    }
}

fn draw_path<S: RenderSurface>(
    surface: &mut S,
    transform: &dyn MapTransform,
    coordinates: &[LatLon],
    style: PathStyle,
) -> usize {
    let points: Vec<Pixel> = coordinates.iter().map(|&c| transform.project(c)).collect();
    surface.stroke_path(&points, style);
    points.len()
}

/// Inactive plans first so the active one ends up on top
fn draw_plans<S: RenderSurface>(
    surface: &mut S,
    transform: &dyn MapTransform,
    style: &RenderStyle,
    plans: &ModePlans,
    active: Option<TransportMode>,
) -> usize {
    let successful = || plans.iter().filter(|plan| plan.success);
    let ordered = successful()
        .filter(|plan| Some(plan.mode) != active)
        .chain(successful().filter(|plan| Some(plan.mode) == active));

    let mut points = 0;
    for plan in ordered {
        let is_active = Some(plan.mode) == active;
        for segment in &plan.sub_segments {
            let mut color = style.for_transport(segment.transport);
            let mut width = style.plan_width;
            if !is_active {
                color = color.with_alpha(style.inactive_alpha);
                width *= 0.6;
            }
            points += draw_path(
                surface,
                transform,
                &segment.coordinates,
                PathStyle { width, color },
            );
        }
    }
    points
}
