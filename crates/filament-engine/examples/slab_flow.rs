//! Slab flow: a four-rank stream trace through a partitioned box.
//!
//! Demonstrates:
//!   1. Building a rank group over `LocalTransport`, one thread per rank
//!   2. Exchanging per-rank bounding boxes with `BoundingBoxLocator`
//!   3. Running a `Tracer` with a tail layout and both directions
//!   4. Reading the per-rank `RunReport`s
//!
//! Run with:
//!   RUST_LOG=filament_engine=debug cargo run --example slab_flow

use filament_core::{IntegrationDirection, Point3, TailLayout};
use filament_engine::{Tracer, TracerConfig};
use filament_locate::BoundingBoxLocator;
use filament_test_utils::{run_ranks, slab, UniformFlowIntegrator};
use filament_transport::Transport;
use tracing_subscriber::EnvFilter;

// ─── Setup ──────────────────────────────────────────────────────

const RANKS: usize = 4;
const STEP: f64 = 0.05;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // A diagonal flow so traces cross slabs at different heights.
    let velocity = Point3::new(1.0, 0.15, 0.0);
    let seeds: Vec<Point3> = (0..5)
        .map(|i| Point3::new(0.4 + 0.7 * i as f64, 0.1 + 0.1 * i as f64, 0.5))
        .collect();

    let reports = run_ranks(RANKS, move |mut t| {
        let r = t.rank().index() as f64;
        let local = slab(r, r + 1.0);
        let locator = BoundingBoxLocator::initialize(&mut t, Some(local))
            .expect("bounding-box exchange failed");
        let layout = TailLayout::stream_tracer();
        let integrator =
            UniformFlowIntegrator::new(velocity, STEP, local).with_layout(layout.clone());
        let config = TracerConfig {
            tail_layout: layout,
            ..TracerConfig::default()
        };
        Tracer::new(t, locator, integrator, config)
            .expect("invalid tracer config")
            .run(&seeds, IntegrationDirection::Both)
            .expect("trace failed")
    });

    // ─── Report ─────────────────────────────────────────────────

    println!("rank  segments  points  finished  sent  received");
    for r in &reports {
        let points: usize = r.segments.iter().map(|s| s.points.len()).sum();
        println!(
            "{:>4}  {:>8}  {:>6}  {:>8}  {:>4}  {:>8}",
            r.rank,
            r.segments.len(),
            points,
            r.finished.len(),
            r.metrics.tasks_sent,
            r.metrics.tasks_received
        );
    }

    println!();
    for f in reports.iter().flat_map(|r| &r.finished) {
        println!(
            "task {:>2} {:<8} hops={} steps={:>3} length={:.3} end={} ({:?})",
            f.token.id(),
            f.token.direction(),
            f.token.num_hops(),
            f.token.step_count(),
            f.token.propagation(),
            f.token.seed,
            f.cause
        );
    }
}
