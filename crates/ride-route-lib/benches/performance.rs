//! Performance benchmarks for ride-route-lib
//!
//! Run with: cargo bench --package ride-route-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ride_route_lib::{
    Canvas, Category, LatLon, LodConfig, MapTransform, Node, NodeStore, RenderStyle, Scene,
    SpatialQuery, Viewport, ViewportRenderer,
};
use std::sync::Arc;
use tokio::sync::broadcast;

const CENTER: LatLon = LatLon::new(37.5665, 126.9780);

/// A city-sized node set: dense places on a jittered grid, one station in twenty
fn generate_nodes(count: usize) -> Vec<Node> {
    let side = (count as f64).sqrt().ceil() as usize;
    (0..count)
        .map(|i| {
            let row = (i / side) as f64;
            let col = (i % side) as f64;
            let jitter = ((i as f64) * 12.9898).sin() * 0.0002;
            let lat = CENTER.lat - 0.05 + row * 0.1 / side as f64 + jitter;
            let lon = CENTER.lon - 0.05 + col * 0.1 / side as f64 - jitter;
            let category = match i % 40 {
                0 => Category::BikeStation,
                20 => Category::EBikeStation,
                _ => Category::Place,
            };
            Node::new(i as i64, lat, lon, category)
        })
        .collect()
}

// ============================================================================
// Core Benchmarks
// ============================================================================

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    group.sample_size(20);

    let nodes = generate_nodes(100_000);
    group.throughput(Throughput::Elements(nodes.len() as u64));
    group.bench_function("store_100k", |b| {
        b.iter(|| NodeStore::new(nodes.clone()));
    });

    group.finish();
}

fn bench_hit_test(c: &mut Criterion) {
    let mut group = c.benchmark_group("hit_test");

    for count in [10_000, 100_000] {
        let store = NodeStore::new(generate_nodes(count));
        let view = Viewport::new(CENTER, 16.0, (1280.0, 800.0));
        let click = view.project(CENTER).offset(7.0, -3.0);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("nearest_to_pixel", count), &store, |b, store| {
            b.iter(|| SpatialQuery::new(store).nearest_to_pixel(&view, click, 20.0));
        });
        group.bench_with_input(BenchmarkId::new("nearest_station", count), &store, |b, store| {
            b.iter(|| SpatialQuery::new(store).nearest_in_category(CENTER, Category::BikeStation));
        });
    }

    group.finish();
}

fn bench_render_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_frame");
    group.sample_size(30);

    let scene = Scene {
        nodes: Arc::new(NodeStore::new(generate_nodes(100_000))),
        ..Scene::default()
    };
    let (sender, _) = broadcast::channel(4);
    let mut renderer = ViewportRenderer::new(LodConfig::default(), RenderStyle::default());
    renderer.attach(Canvas::new(), &sender);

    // 15: places hidden, 16: declutter grid, 17: everything drawn
    for zoom in [15.0, 16.0, 17.0] {
        let view = Viewport::new(CENTER, zoom, (1280.0, 800.0));
        group.bench_with_input(BenchmarkId::new("zoom", zoom), &view, |b, view| {
            b.iter(|| {
                renderer.request_redraw();
                renderer.render_frame(view, &scene)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_construction, bench_hit_test, bench_render_frame);

criterion_main!(benches);
