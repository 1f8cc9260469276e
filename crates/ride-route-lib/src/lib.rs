//! Ride Route Library - Core Data Structures for Shared-Mobility Route Maps
//!
//! This library holds everything behind the map view that does not depend on a UI toolkit:
//! the per-session node set, spatial queries for clicks and station lookup, the zoom-based
//! declutter policy, a retained rendering surface, and the engine that composes routes out
//! of segments fetched from an external routing service.
//!
//! # Architecture
//!
//! - **[`NodeStore`]**: Immutable set of points partitioned by [`Category`]
//! - **[`SpatialQuery`]**: Pixel hit testing and nearest-station resolution
//! - **[`DeclutterGrid`]**: Per-frame level-of-detail visibility for dense place nodes
//! - **[`ViewportRenderer`]**: Attach/detach lifecycle, single-slot redraw scheduling
//! - **[`RouteComposer`]**: Three-segment and via-chain composition with fallbacks
//! - **[`ModePlanSelector`]**: Whole-route alternatives per transport mode
//! - **[`Session`]**: The coordinator that owns selection state and commits async results
//!
//! # Concurrency
//!
//! All mutable state lives in [`Session`]. Network work runs as tokio tasks whose results
//! are tagged with a [`GuardToken`]; a result is committed only while its token is current.

mod client;
pub mod compat;
mod composer;
mod config;
mod declutter;
mod nodes;
mod plans;
mod renderer;
mod route;
mod selection;
mod service;
mod session;
mod spatial;
mod surface;
#[cfg(test)]
mod testing;
pub mod utils;
mod viewport;

// Public API exports
pub use client::{ClientConfig, HttpRoutingClient};
pub use composer::RouteComposer;
pub use config::Config;
pub use declutter::{CellKey, DeclutterGrid, LodConfig, should_draw};
pub use nodes::{Category, Node, NodeId, NodeKey, NodeStore};
pub use plans::{ModePlan, ModePlanSelector, ModePlans, PlanRequestState, PlanSummary, TimeShare};
pub use renderer::{FrameStats, MapEvent, Overlay, RenderStyle, Scene, ViewportRenderer};
pub use route::{ComposedRoute, Fallback, RouteSegment, Strategy, TransportMode, stitch};
pub use selection::{GuardToken, PrioritySet, Role, Selection};
pub use service::{HealthStatus, RoutingService};
pub use session::{NodesState, Outcome, Session, SessionEvent};
pub use spatial::SpatialQuery;
pub use surface::{Canvas, PathStyle, PointStyle, Primitive, RenderSurface, Rgba};
pub use utils::LatLon;
pub use viewport::{MapTransform, Pixel, Viewport};

/// Errors raised while talking to the routing service or composing routes
///
/// None of these is fatal: the composer turns every one of them into a documented
/// fallback, and they only surface as log lines.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("routing service returned HTTP {status}")]
    Status { status: u16 },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("routing service reported failure: {0}")]
    Rejected(String),

    #[error("no {0:?} node available for station resolution")]
    MissingStation(Category),
}

/// Errors raised when the user picks a transport mode
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error("mode plans have not been fetched yet")]
    NotReady,

    #[error("no successful plan for {0}")]
    ModeUnavailable(TransportMode),
}

pub type Result<T> = std::result::Result<T, RouteError>;
