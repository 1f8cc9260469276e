use clap::{Parser, ValueEnum};
use ride_route_lib::{Category, ClientConfig, Config, LodConfig};
use std::time::Duration;

/// Station family used for the ride leg when no mode is selected
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RideKind {
    Bike,
    Ebike,
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Ride Route Viewer - Pick places and stations on a map and compare walk, bike and e-bike routes
pub struct Settings {
    /// Base URL of the routing service API
    #[clap(long, default_value = "http://localhost:5001/api")]
    pub api_url: String,

    /// Request timeout in seconds
    #[clap(long, default_value = "15")]
    pub timeout_secs: u64,

    /// Maximum click distance in pixels for selecting a node
    #[clap(long, default_value = "20")]
    pub hit_threshold: f32,

    /// Declutter cell size in pixels
    #[clap(long, default_value = "25")]
    pub declutter_cell: f32,

    /// Zoom at which places start to show (thinned by the declutter grid)
    #[clap(long, default_value = "16")]
    pub grid_zoom: f64,

    /// Zoom at which every place is drawn
    #[clap(long, default_value = "17")]
    pub full_zoom: f64,

    /// Initial map center latitude (defaults to the center of the loaded nodes)
    #[clap(long)]
    pub center_lat: Option<f64>,

    /// Initial map center longitude (defaults to the center of the loaded nodes)
    #[clap(long)]
    pub center_lon: Option<f64>,

    /// Initial zoom level (defaults to fitting the loaded nodes)
    #[clap(long)]
    pub zoom: Option<f64>,

    /// Station family for the ride leg of composed routes
    #[clap(long, value_enum, default_value = "bike")]
    pub ride: RideKind,

    /// Do not compose a route automatically when the stops change
    #[clap(long, default_value = "false")]
    pub manual_compose: bool,

    /// Start with the node overlay detached from the map
    #[clap(long, default_value = "false")]
    pub no_nodes_overlay: bool,

    /// Log filter used when RUST_LOG is not set
    #[clap(long, default_value = "info,eframe=warn")]
    pub log_level: String,
}

impl Settings {
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn config(&self) -> Config {
        Config {
            hit_threshold_px: self.hit_threshold,
            lod: LodConfig {
                grid_zoom: self.grid_zoom,
                full_zoom: self.full_zoom,
                cell_px: self.declutter_cell,
            },
            default_ride_category: match self.ride {
                RideKind::Bike => Category::BikeStation,
                RideKind::Ebike => Category::EBikeStation,
            },
            auto_compose: !self.manual_compose,
        }
    }
}
