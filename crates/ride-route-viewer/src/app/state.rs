//! Application state that lives outside the routing session
//!
//! UI toggles, tile provider choice, renderer statistics and the status line.

use crate::app::settings::Settings;
use ride_route_lib::{FrameStats, LodConfig, NodesState, Outcome};
use walkers::{
    HttpTiles, TileId,
    sources::{Attribution, OpenStreetMap, TileSource},
};

/// UI-specific settings that can be adjusted at runtime
#[derive(Clone)]
pub struct UiSettings {
    /// Whether sidebar is open
    pub sidebar_open: bool,

    /// Current active tab in sidebar
    pub active_tab: SidebarTab,

    /// Whether the node overlay is attached to the map
    pub nodes_overlay: bool,

    /// Map tiles provider
    pub tiles_provider: TilesProvider,

    /// Show renderer statistics in the sidebar
    pub show_stats: bool,

    /// Zoom bands and declutter cell size applied to the node overlay
    pub lod: LodConfig,
}

impl UiSettings {
    pub fn new(settings: &Settings) -> Self {
        Self {
            sidebar_open: true,
            active_tab: SidebarTab::Route,
            nodes_overlay: !settings.no_nodes_overlay,
            tiles_provider: TilesProvider::OpenStreetMap,
            show_stats: false,
            lod: settings.config().lod,
        }
    }
}

/// Sidebar tabs
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SidebarTab {
    Route,
    Settings,
}

/// Available map tile providers
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TilesProvider {
    OpenStreetMap,
    CyclOSM,
}

impl TilesProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "OpenStreetMap",
            Self::CyclOSM => "CyclOSM",
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "© OpenStreetMap contributors",
            Self::CyclOSM => "© CyclOSM | © OpenStreetMap contributors",
        }
    }
}

/// CyclOSM tiles, a cycling-oriented OpenStreetMap style
pub struct CyclOsm;

impl TileSource for CyclOsm {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://a.tile-cyclosm.openstreetmap.fr/cyclosm/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© CyclOSM (CC-BY-SA)",
            url: "https://www.cyclosm.org/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        20
    }
}

/// One tile cache per provider so switching keeps what was already fetched
pub struct Tiles {
    osm: HttpTiles,
    cyclosm: HttpTiles,
}

impl Tiles {
    pub fn new(ctx: &egui::Context) -> Self {
        Self {
            osm: HttpTiles::new(OpenStreetMap, ctx.clone()),
            cyclosm: HttpTiles::new(CyclOsm, ctx.clone()),
        }
    }

    pub fn get(&mut self, provider: TilesProvider) -> &mut HttpTiles {
        match provider {
            TilesProvider::OpenStreetMap => &mut self.osm,
            TilesProvider::CyclOSM => &mut self.cyclosm,
        }
    }
}

/// Statistics about the map overlay
#[derive(Default, Clone)]
pub struct Stats {
    /// Counters from the most recent drawn frame
    pub last_frame: FrameStats,

    /// Time spent in the most recent drawn frame
    pub last_frame_ms: f64,

    /// Frames drawn since startup
    pub frames_drawn: u64,
}

/// Short human-readable status shown at the top of the sidebar
#[derive(Default, Clone)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
}

impl StatusLine {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    /// Status for an outcome committed by the session, if it is worth showing
    pub fn for_outcome(outcome: &Outcome) -> Option<Self> {
        match outcome {
            Outcome::NodesLoaded(count) => Some(Self::info(format!("Loaded {count} nodes"))),
            Outcome::NodesFailed(message) => {
                Some(Self::error(format!("Failed to load nodes: {message}")))
            }
            Outcome::RouteCommitted => Some(Self::info("Route ready")),
            Outcome::PlansCommitted => Some(Self::info("Mode plans ready")),
            Outcome::Stale => None,
        }
    }

    pub fn for_nodes(state: &NodesState) -> Option<Self> {
        match state {
            NodesState::NotLoaded => None,
            NodesState::Loading => Some(Self::info("Loading nodes…")),
            NodesState::Loaded(count) => Some(Self::info(format!("Loaded {count} nodes"))),
            NodesState::Failed(message) => {
                Some(Self::error(format!("Failed to load nodes: {message}")))
            }
        }
    }
}
