//! Walkers plugin for drawing the node overlay on the map view
//!
//! The plugin adapts the walkers projector to [`MapTransform`], turns map interaction into
//! [`MapEvent`]s for the renderer, lets the renderer redraw its retained canvas when a
//! frame is pending, and paints that canvas every display frame.

use egui::{Color32, Pos2, Stroke, Vec2};
use ride_route_lib::{
    Canvas, FrameStats, LatLon, MapEvent, MapTransform, Node, Pixel, Primitive, Rgba, Scene,
    SpatialQuery, ViewportRenderer,
};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use walkers::{MapMemory, Plugin, Projector};

/// Renderer and bookkeeping shared between the app and the per-frame plugin
pub struct Overlay {
    pub renderer: ViewportRenderer<Canvas>,
    pub tracker: MapEventTracker,
    /// Result of the last click on the map, taken by the app
    pub click: Option<Option<Node>>,
    /// Counters from the last frame the renderer drew
    pub frame: Option<(FrameStats, f64)>,
}

impl Overlay {
    pub fn new(renderer: ViewportRenderer<Canvas>) -> Self {
        Self {
            renderer,
            tracker: MapEventTracker::default(),
            click: None,
            frame: None,
        }
    }
}

/// [`MapTransform`] over the walkers projector, with pixels relative to the map widget
pub struct ProjectorTransform<'a> {
    projector: &'a Projector,
    origin: Pos2,
    size: Vec2,
    zoom: f64,
}

impl<'a> ProjectorTransform<'a> {
    pub fn new(projector: &'a Projector, rect: egui::Rect, zoom: f64) -> Self {
        Self {
            projector,
            origin: rect.min,
            size: rect.size(),
            zoom,
        }
    }

    pub fn to_pixel(&self, pos: Pos2) -> Pixel {
        Pixel::new(pos.x - self.origin.x, pos.y - self.origin.y)
    }

    pub fn to_screen(&self, pixel: Pixel) -> Pos2 {
        Pos2::new(pixel.x + self.origin.x, pixel.y + self.origin.y)
    }
}

impl MapTransform for ProjectorTransform<'_> {
    fn project(&self, position: LatLon) -> Pixel {
        let screen = self
            .projector
            .project(walkers::lat_lon(position.lat, position.lon));
        Pixel::new(screen.x - self.origin.x, screen.y - self.origin.y)
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn size(&self) -> (f32, f32) {
        (self.size.x, self.size.y)
    }

    fn center(&self) -> LatLon {
        let middle = self.origin.to_vec2() + self.size / 2.0;
        let position = self.projector.unproject(middle);
        LatLon::new(position.y(), position.x())
    }
}

/// Turns per-frame map state into discrete events: a pan is reported once the drag ends,
/// zoom and size changes as soon as they are seen
#[derive(Default)]
pub struct MapEventTracker {
    zoom: Option<f64>,
    size: Option<Vec2>,
    center: Option<LatLon>,
    dragging: bool,
}

impl MapEventTracker {
    pub fn observe(
        &mut self,
        response: &egui::Response,
        transform: &ProjectorTransform<'_>,
    ) -> Vec<MapEvent> {
        let mut events = Vec::new();

        let size = transform.size;
        if self.size.is_some_and(|s| s != size) {
            events.push(MapEvent::Resized(size.x, size.y));
        }
        self.size = Some(size);

        let zoom = transform.zoom;
        if self.zoom.is_some_and(|z| z != zoom) {
            events.push(MapEvent::ZoomChanged(zoom));
        }
        self.zoom = Some(zoom);

        // Zooming also moves the center; only a center change at constant zoom is a pan.
        let center = transform.center();
        let moved = self.center.is_some_and(|c| c != center);
        self.center = Some(center);

        if response.dragged() {
            self.dragging = true;
        } else if self.dragging {
            self.dragging = false;
            events.push(MapEvent::PanEnded);
        } else if moved && events.is_empty() {
            // Programmatic moves (fit to bounds, keyboard) have no drag phase
            events.push(MapEvent::PanEnded);
        }

        events
    }
}

/// Plugin that draws places, stations and the route overlay
pub struct NodesPlugin {
    overlay: Arc<Mutex<Overlay>>,
    events: broadcast::Sender<MapEvent>,
    scene: Scene,
    hit_threshold_px: f32,
}

impl NodesPlugin {
    pub fn new(
        overlay: Arc<Mutex<Overlay>>,
        events: broadcast::Sender<MapEvent>,
        scene: Scene,
        hit_threshold_px: f32,
    ) -> Self {
        Self {
            overlay,
            events,
            scene,
            hit_threshold_px,
        }
    }
}

impl Plugin for NodesPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        map_memory: &MapMemory,
    ) {
        profiling::scope!("NodesPlugin::run");

        let Ok(mut overlay) = self.overlay.lock() else {
            tracing::error!("Node overlay lock poisoned, skipping frame");
            return;
        };
        let transform = ProjectorTransform::new(projector, response.rect, map_memory.zoom());

        for event in overlay.tracker.observe(response, &transform) {
            // No receivers just means the overlay is detached
            let _ = self.events.send(event);
        }

        if response.clicked()
            && let Some(pos) = response.interact_pointer_pos()
        {
            let hit = SpatialQuery::new(&self.scene.nodes)
                .nearest_to_pixel(&transform, transform.to_pixel(pos), self.hit_threshold_px)
                .copied();
            tracing::debug!("Map click at {pos:?} hit {hit:?}");
            overlay.click = Some(hit);
        }

        overlay.renderer.pump_events();
        let start = instant::Instant::now();
        if let Some(stats) = overlay.renderer.render_frame(&transform, &self.scene) {
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            tracing::trace!("Overlay frame: {stats:?} in {elapsed_ms:.2} ms");
            overlay.frame = Some((stats, elapsed_ms));
        }

        if let Some(canvas) = overlay.renderer.surface() {
            let painter = ui.painter().with_clip_rect(response.rect);
            paint_canvas(canvas, &transform, &painter);
        }
    }
}

fn color(rgba: Rgba) -> Color32 {
    let [r, g, b, a] = rgba.0;
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Replay the canvas, shifted by however far the map moved since it was drawn
fn paint_canvas(canvas: &Canvas, transform: &ProjectorTransform<'_>, painter: &egui::Painter) {
    profiling::scope!("paint_canvas");

    let (dx, dy) = canvas.drift(transform);
    let screen = |pixel: Pixel| transform.to_screen(pixel.offset(dx, dy));

    for primitive in canvas.primitives() {
        match primitive {
            Primitive::Point { at, style } => {
                let center = screen(*at);
                painter.circle_filled(center, style.radius, color(style.fill));
                if let Some((width, outline)) = style.outline {
                    painter.circle_stroke(center, style.radius, Stroke::new(width, color(outline)));
                }
            }
            Primitive::Path { points, style } => {
                let points: Vec<Pos2> = points.iter().map(|p| screen(*p)).collect();
                if points.len() >= 2 {
                    painter.add(egui::Shape::line(
                        points,
                        Stroke::new(style.width, color(style.color)),
                    ));
                }
            }
        }
    }
}
