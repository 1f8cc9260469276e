#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use ride_route_viewer::{RideRouteViewerApp, Settings};

fn main() -> eframe::Result {
    let settings = Settings::from_cli();
    ride_route_viewer::setup_logging(&settings.log_level);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!("Failed to start the async runtime: {err}");
            std::process::exit(1);
        }
    };
    // Background requests are spawned from the UI thread
    let _guard = rt.enter();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Ride Route Viewer")
            .with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Ride Route Viewer",
        native_options,
        Box::new(|cc| Ok(Box::new(RideRouteViewerApp::new(cc, settings)?))),
    )
}
