//! Integration test: end-to-end tracing runs over slab partitions.
//!
//! Each test spawns one thread per rank over `LocalTransport`, exchanges
//! bounding boxes, and runs a full `Tracer` with a uniform +x flow.
//! Assertions are made on the per-rank `RunReport`s.

use filament_core::{BoundingBox, IntegrationDirection, Point3, Rank, TaskId, TaskKind};
use filament_engine::{FinishCause, RunReport, Tracer, TracerConfig};
use filament_locate::BoundingBoxLocator;
use filament_test_utils::{run_ranks, slab, UniformFlowIntegrator};
use filament_transport::Transport;

// ── Harness ──────────────────────────────────────────────────────────

/// Run a forward trace from `seeds` over one box (or none) per rank.
fn trace_slabs(
    boxes: Vec<Option<BoundingBox>>,
    seeds: Vec<Point3>,
    step: f64,
    config: TracerConfig,
) -> Vec<RunReport> {
    run_ranks(boxes.len(), move |mut t| {
        let local = boxes[t.rank().index()];
        let locator = BoundingBoxLocator::initialize(&mut t, local).unwrap();
        let domain = local.unwrap_or_else(|| slab(0.0, 1.0));
        let integrator = UniformFlowIntegrator::new(Point3::new(1.0, 0.0, 0.0), step, domain);
        Tracer::new(t, locator, integrator, config.clone())
            .unwrap()
            .run(&seeds, IntegrationDirection::Forward)
            .unwrap()
    })
}

fn at(x: f64) -> Point3 {
    Point3::new(x, 0.5, 0.5)
}

fn finished_count(reports: &[RunReport]) -> usize {
    reports.iter().map(|r| r.finished.len()).sum()
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn single_rank_owning_everything_finishes_every_seed() {
    let reports = trace_slabs(
        vec![Some(slab(0.0, 1.0))],
        vec![at(0.1), at(0.5), at(0.9)],
        0.1,
        TracerConfig::default(),
    );
    let r = &reports[0];
    assert_eq!(r.total_tasks, 3);
    assert_eq!(r.metrics.tasks_started, 3);
    assert_eq!(r.finished.len(), 3);
    assert_eq!(r.metrics.tasks_sent, 0);
    assert_eq!(r.metrics.finish_reports_sent, 0);
}

#[test]
fn crossing_into_the_neighbour_migrates_exactly_once() {
    let reports = trace_slabs(
        vec![Some(slab(0.0, 1.0)), Some(slab(1.0, 2.0))],
        vec![at(0.9)],
        0.2,
        TracerConfig::default(),
    );
    let (r0, r1) = (&reports[0], &reports[1]);

    assert_eq!(r0.metrics.tasks_sent, 1);
    assert_eq!(r1.metrics.tasks_received, 1);
    assert_eq!(r1.metrics.tasks_sent, 0);

    assert!(r0.finished.is_empty());
    assert_eq!(r1.finished.len(), 1);
    assert_eq!(r1.finished[0].cause, FinishCause::NoOwner);
    assert_eq!(r1.metrics.finish_reports_sent, 1);
    assert_eq!(r0.metrics.finish_reports_received, 1);

    assert_eq!(r0.metrics.no_more_tasks_sent, 1);
    assert_eq!(r1.metrics.no_more_tasks_received, 1);
}

#[test]
fn seed_outside_every_box_is_never_scheduled() {
    let reports = trace_slabs(
        vec![Some(slab(0.0, 1.0)), Some(slab(1.0, 2.0))],
        vec![at(0.5), at(7.0)],
        0.2,
        TracerConfig::default(),
    );
    for r in &reports {
        assert_eq!(r.total_tasks, 1);
        assert!(r.segments.iter().all(|s| s.task == TaskId(0)));
    }
    assert_eq!(finished_count(&reports), 1);
    let seeded: u64 = reports.iter().map(|r| r.metrics.seeded).sum();
    assert_eq!(seeded, 1);
}

#[test]
fn lowest_rank_with_data_leads() {
    let reports = trace_slabs(
        vec![None, Some(slab(0.0, 1.0)), Some(slab(1.0, 2.0))],
        vec![at(0.5)],
        0.2,
        TracerConfig::default(),
    );
    for r in &reports {
        assert_eq!(r.leader, Some(Rank(1)));
    }
    let idle = &reports[0];
    assert!(idle.segments.is_empty());
    assert_eq!(idle.metrics.tasks_started, 0);
    assert_eq!(idle.metrics.no_more_tasks_received, 0);
    // Only rank 2 is told to stop.
    assert_eq!(reports[1].metrics.no_more_tasks_sent, 1);
    assert_eq!(reports[2].metrics.no_more_tasks_received, 1);
}

#[test]
fn five_hops_accumulate_steps_and_keep_the_latest_tail() {
    let boxes = (0..6).map(|i| Some(slab(i as f64, i as f64 + 1.0))).collect();
    let reports = trace_slabs(boxes, vec![at(0.1)], 0.25, TracerConfig::default());

    assert_eq!(finished_count(&reports), 1);
    let last = &reports[5];
    assert_eq!(last.finished.len(), 1);
    let token = &last.finished[0].token;
    assert_eq!(token.num_hops(), 5);

    let contributed: u64 = reports
        .iter()
        .flat_map(|r| &r.segments)
        .map(|s| s.steps)
        .sum();
    assert_eq!(contributed, token.step_count());
    for r in &reports {
        assert!(r.segments.iter().map(|s| s.steps).sum::<u64>() > 0, "rank {} idle", r.rank);
    }

    let last_point = last.segments.last().unwrap().points.last().unwrap();
    assert_eq!(token.tail.as_ref(), Some(last_point));
}

#[test]
fn stitched_segments_start_at_the_previous_tail() {
    let reports = trace_slabs(
        vec![Some(slab(0.0, 1.0)), Some(slab(1.0, 2.0))],
        vec![at(0.1)],
        0.25,
        TracerConfig::default(),
    );
    let first = reports[0].segments.last().unwrap();
    let second = &reports[1].segments[0];
    assert_eq!(second.points.first(), first.points.last());
    assert!(second.points[1].position.x() > 1.0);
}

#[test]
fn overlapping_boxes_give_the_seed_to_the_highest_rank() {
    let reports = trace_slabs(
        vec![Some(slab(0.0, 2.0)), Some(slab(1.0, 3.0))],
        vec![at(1.5)],
        0.2,
        TracerConfig::default(),
    );
    assert_eq!(reports[0].total_tasks, 1);
    assert_eq!(reports[0].metrics.seeded, 0);
    assert_eq!(reports[1].metrics.seeded, 1);
    assert!(reports[0].segments.is_empty());
    assert_eq!(reports[1].finished.len(), 1);
    assert_eq!(reports[1].finished[0].token.kind, TaskKind::Plain);
}

#[test]
fn step_limit_holds_across_migrations() {
    let config = TracerConfig {
        max_steps: 5,
        ..TracerConfig::default()
    };
    let reports = trace_slabs(
        vec![Some(slab(0.0, 1.0)), Some(slab(1.0, 2.0))],
        vec![at(0.1)],
        0.25,
        config,
    );
    let finished: Vec<_> = reports.iter().flat_map(|r| &r.finished).collect();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].token.step_count(), 5);
    assert!(matches!(finished[0].cause, FinishCause::Terminated(_)));
}
