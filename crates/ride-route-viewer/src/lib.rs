//! Ride Route Viewer - Application Library
//!
//! Integrates the routing session, the node overlay renderer and a walkers map into an
//! eframe application.

mod app;

pub use app::RideRouteViewerApp;
pub use app::settings::Settings;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

/// Install the fmt subscriber. `RUST_LOG` wins over `default_filter`.
pub fn setup_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let fmt_layer = fmt::layer().with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).init();

    tracing::info!("Logging initialized");
}
