//! UI panels for the application
//!
//! The sidebar holds the route stops, actions for the pinned node, the mode plan cards
//! and the settings tab. The map itself is drawn by the plugin.

use crate::app::state::{SidebarTab, Stats, StatusLine, TilesProvider, UiSettings};
use egui::{Color32, RichText, Ui};
use ride_route_lib::{
    Category, ComposedRoute, Fallback, LodConfig, ModePlan, Node, PlanRequestState, RenderStyle,
    RoutingService, Session, Strategy, TimeShare, TransportMode,
};

/// What the sidebar asked the app to do outside the session
#[derive(Default)]
pub struct SidebarActions {
    pub fit_to_nodes: bool,
}

/// Render the sidebar toggle button (overlaid on top-right of map)
pub fn sidebar_toggle_button(ui: &mut Ui, ui_settings: &mut UiSettings) {
    let button_size = egui::vec2(40.0, 40.0);
    let margin = 10.0;

    let rect = ui.max_rect();
    let button_pos = rect.right_top() + egui::vec2(-button_size.x - margin, margin);
    let button_rect = egui::Rect::from_min_size(button_pos, button_size);

    let response = ui.allocate_rect(button_rect, egui::Sense::click());

    if response.clicked() {
        ui_settings.sidebar_open = !ui_settings.sidebar_open;
    }

    let bg_color = if response.hovered() {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.inactive.bg_fill
    };

    ui.painter().rect_filled(button_rect, 5.0, bg_color);

    let icon = if ui_settings.sidebar_open { "✕" } else { "☰" };

    ui.painter().text(
        button_rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(20.0),
        ui.visuals().text_color(),
    );
}

/// Render the main sidebar (responsive: side on landscape, bottom on portrait)
pub fn render_sidebar<R: RoutingService>(
    ctx: &egui::Context,
    session: &mut Session<R>,
    ui_settings: &mut UiSettings,
    stats: &Stats,
    status: &StatusLine,
) -> SidebarActions {
    let mut actions = SidebarActions::default();
    if !ui_settings.sidebar_open {
        return actions;
    }

    let screen_size = ctx.viewport_rect().size();
    let mut content = |ui: &mut Ui| {
        render_sidebar_content(ui, session, ui_settings, stats, status, &mut actions)
    };

    if screen_size.y > screen_size.x {
        egui::TopBottomPanel::bottom("main_sidebar")
            .default_height(280.0)
            .min_height(180.0)
            .max_height(ctx.viewport_rect().height() * 0.6)
            .resizable(true)
            .show(ctx, |ui| content(ui));
    } else {
        egui::SidePanel::right("main_sidebar")
            .default_width(320.0)
            .min_width(260.0)
            .max_width(450.0)
            .resizable(true)
            .show(ctx, |ui| content(ui));
    }

    actions
}

fn render_sidebar_content<R: RoutingService>(
    ui: &mut Ui,
    session: &mut Session<R>,
    ui_settings: &mut UiSettings,
    stats: &Stats,
    status: &StatusLine,
    actions: &mut SidebarActions,
) {
    ui.horizontal(|ui| {
        ui.selectable_value(&mut ui_settings.active_tab, SidebarTab::Route, "🧭 Route");
        ui.selectable_value(
            &mut ui_settings.active_tab,
            SidebarTab::Settings,
            "⚙ Settings",
        );
    });

    if !status.text.is_empty() {
        let color = if status.is_error {
            Color32::from_rgb(220, 80, 80)
        } else {
            ui.visuals().weak_text_color()
        };
        ui.label(RichText::new(&status.text).color(color).small());
    }

    ui.separator();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| match ui_settings.active_tab {
            SidebarTab::Route => render_route_tab(ui, session),
            SidebarTab::Settings => {
                render_settings_tab(ui, session, ui_settings, stats, actions)
            }
        });
}

fn describe(node: &Node) -> String {
    let kind = match node.category {
        Category::Place => "Place",
        Category::BikeStation => "Bike station",
        Category::EBikeStation => "E-bike station",
    };
    format!("{kind} #{}", node.id)
}

fn has_endpoints<R: RoutingService>(session: &Session<R>) -> bool {
    session.selection().start().is_some() && session.selection().dest().is_some()
}

fn render_route_tab<R: RoutingService>(ui: &mut Ui, session: &mut Session<R>) {
    render_pinned_section(ui, session);
    ui.separator();
    render_stops_section(ui, session);
    ui.separator();
    render_plans_section(ui, session);
}

/// Actions for the node picked on the map
fn render_pinned_section<R: RoutingService>(ui: &mut Ui, session: &mut Session<R>) {
    ui.heading("📍 Selected");

    let Some(pinned) = session.selection().pinned().copied() else {
        ui.label(RichText::new("Click a place or station on the map").weak());
        return;
    };

    ui.label(describe(&pinned));
    ui.label(
        RichText::new(format!("{:.5}, {:.5}", pinned.lat, pinned.lon))
            .small()
            .weak(),
    );

    let endpoints_set = has_endpoints(session);
    ui.horizontal_wrapped(|ui| {
        if ui.button("Set as start").clicked() {
            session.set_start(Some(pinned));
        }
        if ui.button("Set as destination").clicked() {
            session.set_dest(Some(pinned));
        }
        if ui
            .add_enabled(endpoints_set, egui::Button::new("Add via"))
            .on_disabled_hover_text("Pick a start and destination first")
            .clicked()
        {
            session.add_via(pinned);
        }
        if ui.button("✕").on_hover_text("Clear selection").clicked() {
            session.node_clicked(None);
        }
    });
}

/// Start, via stops, destination and the composed route
fn render_stops_section<R: RoutingService>(ui: &mut Ui, session: &mut Session<R>) {
    ui.heading("🚩 Stops");

    let start = session.selection().start().copied();
    let dest = session.selection().dest().copied();
    let via = session.selection().via().to_vec();

    egui::Grid::new("stops_grid")
        .num_columns(3)
        .spacing([8.0, 4.0])
        .show(ui, |ui| {
            ui.label("Start:");
            ui.label(start.as_ref().map_or("—".to_string(), describe));
            if start.is_some() && ui.small_button("✕").clicked() {
                session.set_start(None);
            }
            ui.end_row();

            let mut removed = None;
            for (index, node) in via.iter().enumerate() {
                ui.label(format!("Via {}:", index + 1));
                ui.label(describe(node));
                if ui.small_button("✕").clicked() {
                    removed = Some(index);
                }
                ui.end_row();
            }
            if let Some(index) = removed {
                session.remove_via(index);
            }

            ui.label("Destination:");
            ui.label(dest.as_ref().map_or("—".to_string(), describe));
            if dest.is_some() && ui.small_button("✕").clicked() {
                session.set_dest(None);
            }
            ui.end_row();
        });

    let has_stops = start.is_some() && dest.is_some();
    ui.horizontal_wrapped(|ui| {
        if ui.add_enabled(has_stops, egui::Button::new("⇅ Swap")).clicked() {
            session.swap_endpoints();
        }
        if ui.add_enabled(has_stops, egui::Button::new("🧭 Compose")).clicked() {
            session.request_route();
        }
        if ui.button("🗑 Clear").clicked() {
            session.clear_route();
        }
    });

    if session.is_composing() {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Composing route…");
        });
    } else if let Some(route) = session.route() {
        render_route_summary(ui, route);
    }
}

fn render_route_summary(ui: &mut Ui, route: &ComposedRoute) {
    let strategy = match route.strategy() {
        Strategy::ThreeSegment => "walk → ride → walk",
        Strategy::ViaChain => "through via stops",
    };
    ui.label(format!(
        "{:.2} km {strategy} ({} points)",
        route.length_meters() / 1000.0,
        route.len()
    ));

    let note = match route.fallback() {
        Fallback::None => None,
        Fallback::Direct => Some("No station nearby, routed directly".to_string()),
        Fallback::StraightLine => Some("Routing failed, showing a straight line".to_string()),
        Fallback::PartialStraightLine { legs } => {
            Some(format!("{legs} leg(s) could not be routed and are straight lines"))
        }
    };
    if let Some(note) = note {
        ui.label(RichText::new(note).color(Color32::from_rgb(200, 140, 40)).small());
    }
}

/// Whole-route alternatives per transport mode
fn render_plans_section<R: RoutingService>(ui: &mut Ui, session: &mut Session<R>) {
    ui.heading("🚲 Modes");

    let endpoints_set = has_endpoints(session);
    if ui
        .add_enabled(endpoints_set, egui::Button::new("Compare walk, bike and e-bike"))
        .clicked()
    {
        session.request_mode_plans();
    }

    let plans = match session.plan_state() {
        PlanRequestState::NotRequested => return,
        PlanRequestState::Pending { .. } => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Planning…");
            });
            return;
        }
        PlanRequestState::Failed { message } => {
            ui.colored_label(Color32::from_rgb(220, 80, 80), message);
            return;
        }
        PlanRequestState::Ready { plans } => plans.clone(),
    };

    let active = session.selection().active_mode();
    let style = RenderStyle::default();
    let mut selected = None;
    for plan in plans.iter() {
        if render_plan_card(ui, plan, active == Some(plan.mode), &style) {
            selected = Some(plan.mode);
        }
    }

    if let Some(mode) = selected
        && let Err(err) = session.select_mode(mode)
    {
        tracing::warn!("Cannot select {mode}: {err}");
    }
}

/// One selectable card. Returns true when clicked.
fn render_plan_card(ui: &mut Ui, plan: &ModePlan, is_active: bool, style: &RenderStyle) -> bool {
    let mut clicked = false;
    let frame = egui::Frame::group(ui.style()).stroke(if is_active {
        ui.visuals().selection.stroke
    } else {
        ui.visuals().widgets.noninteractive.bg_stroke
    });

    frame.show(ui, |ui| {
        ui.set_width(ui.available_width());
        let title = RichText::new(plan.mode.label()).strong();
        if !plan.success {
            ui.label(title.weak());
            let reason = plan.failure_message.as_deref().unwrap_or("No route for this mode");
            ui.label(RichText::new(reason).small().weak());
            return;
        }

        clicked = ui.selectable_label(is_active, title).clicked();
        let summary = plan.summary();
        ui.label(format!("{:.0} min", plan.total_time_minutes));
        ui.label(RichText::new(&summary.text).small());
        render_time_bar(ui, &summary.blocks, style);
    });

    clicked
}

fn transport_color(style: &RenderStyle, mode: TransportMode) -> Color32 {
    let [r, g, b, _] = style.for_transport(mode).0;
    Color32::from_rgb(r, g, b)
}

/// Horizontal bar split by each leg's share of the travel time
fn render_time_bar(ui: &mut Ui, blocks: &[(TimeShare, f64)], style: &RenderStyle) {
    if blocks.is_empty() {
        return;
    }
    let (rect, _) =
        ui.allocate_exact_size(egui::vec2(ui.available_width(), 6.0), egui::Sense::hover());
    let mut x = rect.min.x;
    for (share, fraction) in blocks {
        let width = rect.width() * *fraction as f32;
        let block = egui::Rect::from_min_size(
            egui::pos2(x, rect.min.y),
            egui::vec2(width, rect.height()),
        );
        ui.painter()
            .rect_filled(block, 1.0, transport_color(style, share.transport));
        x += width;
    }
}

fn render_settings_tab<R: RoutingService>(
    ui: &mut Ui,
    session: &Session<R>,
    ui_settings: &mut UiSettings,
    stats: &Stats,
    actions: &mut SidebarActions,
) {
    ui.heading("🗺 Map");
    ui.horizontal(|ui| {
        ui.label("Tiles:");
        for provider in [TilesProvider::OpenStreetMap, TilesProvider::CyclOSM] {
            ui.selectable_value(&mut ui_settings.tiles_provider, provider, provider.name());
        }
    });
    ui.checkbox(&mut ui_settings.nodes_overlay, "Show places and stations");
    if ui.button("🎯 Fit to nodes").clicked() {
        actions.fit_to_nodes = true;
    }

    ui.separator();
    ui.heading("📍 Place density");
    render_lod_section(ui, &mut ui_settings.lod);

    ui.separator();
    ui.checkbox(&mut ui_settings.show_stats, "Show statistics");
    if ui_settings.show_stats {
        render_stats_section(ui, session, stats);
    }
}

fn render_lod_section(ui: &mut Ui, lod: &mut LodConfig) {
    ui.add(egui::Slider::new(&mut lod.grid_zoom, 10.0..=20.0).text("Places from zoom"));
    ui.add(
        egui::Slider::new(&mut lod.full_zoom, lod.grid_zoom..=21.0).text("All places from zoom"),
    );
    ui.add(egui::Slider::new(&mut lod.cell_px, 5.0..=80.0).text("Cell size (px)"));
    if ui.button("Reset").clicked() {
        *lod = LodConfig::default();
    }
}

fn render_stats_section<R: RoutingService>(ui: &mut Ui, session: &Session<R>, stats: &Stats) {
    let nodes = session.nodes();
    egui::Grid::new("stats_grid")
        .num_columns(2)
        .spacing([12.0, 2.0])
        .show(ui, |ui| {
            ui.label("Places:");
            ui.label(nodes.count(Category::Place).to_string());
            ui.end_row();
            ui.label("Bike stations:");
            ui.label(nodes.count(Category::BikeStation).to_string());
            ui.end_row();
            ui.label("E-bike stations:");
            ui.label(nodes.count(Category::EBikeStation).to_string());
            ui.end_row();

            let frame = &stats.last_frame;
            ui.label("Drawn:");
            ui.label(frame.nodes_drawn.to_string());
            ui.end_row();
            ui.label("Decluttered:");
            ui.label(frame.nodes_decluttered.to_string());
            ui.end_row();
            ui.label("Off screen:");
            ui.label(frame.nodes_culled.to_string());
            ui.end_row();
            ui.label("Grid cells:");
            ui.label(frame.claimed_cells.to_string());
            ui.end_row();
            ui.label("Route points:");
            ui.label(frame.overlay_points.to_string());
            ui.end_row();
            ui.label("Frame time:");
            ui.label(format!("{:.2} ms", stats.last_frame_ms));
            ui.end_row();
            ui.label("Frames drawn:");
            ui.label(stats.frames_drawn.to_string());
            ui.end_row();
        });
}
