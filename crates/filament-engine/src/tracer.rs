//! Per-rank driver loop.
//!
//! [`Tracer::run`] pulls tasks from the [`TaskManager`], extends each
//! through the [`Integrator`], stitches the new points onto the task's
//! tail, and finds a concrete exit point with one probe step before
//! handing the task back for migration.

use tracing::{info, trace, warn};

use filament_core::{
    seed_tokens, Direction, IntegrationDirection, Integrator, Point3, Rank, StepRequest,
    TaskId, TaskToken, TerminationReason, TracePoint,
};
use filament_locate::ProcessLocator;
use filament_transport::Transport;

use crate::config::TracerConfig;
use crate::error::TracerError;
use crate::manager::{Disposition, FinishCause, FinishedTask, TaskManager};
use crate::metrics::ManagerMetrics;

/// One stitched piece of a trace, produced by one rank in one extension.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceSegment {
    /// The trace this piece belongs to.
    pub task: TaskId,
    /// The rank that produced it.
    pub rank: Rank,
    /// Integration direction of the trace.
    pub direction: Direction,
    /// Polyline, starting with the carried-over tail point when the
    /// trace had one.
    pub points: Vec<TracePoint>,
    /// Integration steps this piece contributed.
    pub steps: u64,
}

/// Everything one rank produced during a run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// The reporting rank.
    pub rank: Rank,
    /// The elected leader.
    pub leader: Option<Rank>,
    /// Global task count.
    pub total_tasks: u64,
    /// Trace pieces in production order.
    pub segments: Vec<TraceSegment>,
    /// Tasks that reached a terminal state on this rank.
    pub finished: Vec<FinishedTask>,
    /// Protocol counters.
    pub metrics: ManagerMetrics,
}

/// Distributed stream tracer for one rank.
pub struct Tracer<T: Transport, L, I> {
    manager: TaskManager<T, L>,
    integrator: I,
    config: TracerConfig,
}

impl<T, L, I> Tracer<T, L, I>
where
    T: Transport,
    L: ProcessLocator,
    I: Integrator,
{
    /// Validate `config` and assemble a tracer.
    pub fn new(
        transport: T,
        locator: L,
        integrator: I,
        config: TracerConfig,
    ) -> Result<Self, TracerError> {
        Ok(Self {
            manager: TaskManager::new(transport, locator, &config)?,
            integrator,
            config,
        })
    }

    /// The underlying task manager.
    pub fn manager(&self) -> &TaskManager<T, L> {
        &self.manager
    }

    /// Trace from `seeds` in `directions`. Collective: every rank must
    /// pass the same seed list.
    pub fn run(
        self,
        seeds: &[Point3],
        directions: IntegrationDirection,
    ) -> Result<RunReport, TracerError> {
        let tokens = seed_tokens(seeds, directions);
        let max_seed_id = tokens.iter().map(|t| t.id().0).max().unwrap_or(0);
        self.run_tokens(tokens, max_seed_id)
    }

    /// Trace prepared tokens. Collective: every rank must pass the same
    /// `max_seed_id`.
    pub fn run_tokens(
        mut self,
        tokens: Vec<TaskToken>,
        max_seed_id: u64,
    ) -> Result<RunReport, TracerError> {
        let has_data = self.manager.locator().has_local_data();
        let summary = self.manager.initialize(has_data, tokens, max_seed_id)?;

        let mut segments = Vec::new();
        while let Some(mut task) = self.manager.next_task()? {
            let disposition = self.extend(&mut task, &mut segments)?;
            self.manager.hand_back(task, disposition)?;
        }

        let rank = self.manager.rank();
        let finished = self.manager.take_finished();
        info!(
            rank = %rank,
            segments = segments.len(),
            finished = finished.len(),
            "tracer done"
        );
        Ok(RunReport {
            rank,
            leader: summary.leader,
            total_tasks: summary.total_tasks,
            segments,
            finished,
            metrics: self.manager.metrics().clone(),
        })
    }

    /// Extend `task` until it must leave this rank or stop.
    fn extend(
        &mut self,
        task: &mut TaskToken,
        segments: &mut Vec<TraceSegment>,
    ) -> Result<Disposition, TracerError> {
        let rank = self.manager.rank();
        let mut local_probes = 0u32;
        loop {
            let request = StepRequest {
                seed: task.seed,
                direction: task.direction(),
                tail: task.tail.as_ref(),
                step_count: task.step_count(),
                propagation: task.propagation(),
                max_steps: self.config.max_steps,
                max_propagation: self.config.max_propagation,
            };
            let segment = self.integrator.integrate(&request);
            let steps = segment.steps_taken(&request);
            task.advance(segment.step_count, segment.propagation)?;

            let Some(last) = segment.points.last().cloned() else {
                return Ok(Disposition::Finish(FinishCause::NoExtension));
            };
            let mut points = Vec::with_capacity(segment.points.len() + 1);
            points.extend(task.tail.take());
            points.extend(segment.points);
            task.tail = Some(last.clone());
            task.check_tail(self.manager.layout())?;
            segments.push(TraceSegment {
                task: task.id(),
                rank,
                direction: task.direction(),
                points,
                steps,
            });

            if !segment.reason.allows_migration() {
                return Ok(Disposition::Finish(FinishCause::Terminated(segment.reason)));
            }
            if task.step_count() >= self.config.max_steps {
                return Ok(Disposition::Finish(FinishCause::Terminated(
                    TerminationReason::ReachedStepLimit,
                )));
            }
            if task.propagation() >= self.config.max_propagation {
                return Ok(Disposition::Finish(FinishCause::Terminated(
                    TerminationReason::ReachedLengthLimit,
                )));
            }

            let Some(exit) = self.integrator.probe(&last, task.direction()) else {
                return Ok(Disposition::Finish(FinishCause::Terminated(segment.reason)));
            };
            task.seed = exit.position;
            if !self.manager.locator().owns(&task.seed) {
                return Ok(Disposition::Continue);
            }

            local_probes += 1;
            if local_probes > self.config.max_local_retries {
                warn!(
                    rank = %rank,
                    task = %task.id(),
                    probes = local_probes,
                    seed = %task.seed,
                    "exit probe keeps landing locally, finishing task"
                );
                return Ok(Disposition::Finish(FinishCause::RetryLimit));
            }
            trace!(rank = %rank, task = %task.id(), seed = %task.seed, "probe landed locally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filament_core::{BoundingBox, Segment, TailLayout};
    use filament_locate::BoundingBoxLocator;
    use filament_test_utils::{slab, UniformFlowIntegrator};
    use filament_transport::LocalTransport;

    fn solo_tracer<I: Integrator>(
        domain: BoundingBox,
        integrator: I,
        config: TracerConfig,
    ) -> Tracer<LocalTransport, BoundingBoxLocator, I> {
        let transport = LocalTransport::group(1).remove(0);
        let locator = BoundingBoxLocator::from_table(Rank(0), vec![Some(domain)]);
        Tracer::new(transport, locator, integrator, config).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let transport = LocalTransport::group(1).remove(0);
        let locator = BoundingBoxLocator::from_table(Rank(0), vec![Some(slab(0.0, 1.0))]);
        let config = TracerConfig {
            max_steps: 0,
            ..TracerConfig::default()
        };
        let integrator = UniformFlowIntegrator::new(Point3::new(1.0, 0.0, 0.0), 0.1, slab(0.0, 1.0));
        assert!(matches!(
            Tracer::new(transport, locator, integrator, config),
            Err(TracerError::Config(_))
        ));
    }

    #[test]
    fn both_directions_trace_each_seed_twice() {
        let domain = slab(0.0, 1.0);
        let integrator = UniformFlowIntegrator::new(Point3::new(1.0, 0.0, 0.0), 0.1, domain);
        let tracer = solo_tracer(domain, integrator, TracerConfig::default());
        let report = tracer
            .run(&[Point3::new(0.5, 0.5, 0.5)], IntegrationDirection::Both)
            .unwrap();

        assert_eq!(report.total_tasks, 2);
        assert_eq!(report.finished.len(), 2);
        let mut ids: Vec<u64> = report.finished.iter().map(|f| f.token.id().0).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1]);
        for f in &report.finished {
            assert_eq!(f.cause, FinishCause::NoOwner);
        }
        let backward = report
            .segments
            .iter()
            .find(|s| s.direction == Direction::Backward)
            .unwrap();
        assert!(backward.points.last().unwrap().position.x() < 0.5);
    }

    #[test]
    fn step_limit_finishes_inside_the_domain() {
        let domain = slab(0.0, 10.0);
        let integrator = UniformFlowIntegrator::new(Point3::new(1.0, 0.0, 0.0), 0.1, domain);
        let config = TracerConfig {
            max_steps: 5,
            ..TracerConfig::default()
        };
        let report = solo_tracer(domain, integrator, config)
            .run(&[Point3::new(0.5, 0.5, 0.5)], IntegrationDirection::Forward)
            .unwrap();
        assert_eq!(report.finished.len(), 1);
        let done = &report.finished[0];
        assert_eq!(done.token.step_count(), 5);
        assert_eq!(
            done.cause,
            FinishCause::Terminated(TerminationReason::ReachedStepLimit)
        );
    }

    #[test]
    fn tail_carries_the_last_point_and_layout() {
        let domain = slab(0.0, 1.0);
        let layout = TailLayout::stream_tracer();
        let integrator = UniformFlowIntegrator::new(Point3::new(1.0, 0.0, 0.0), 0.25, domain)
            .with_layout(layout.clone());
        let config = TracerConfig {
            tail_layout: layout.clone(),
            ..TracerConfig::default()
        };
        let report = solo_tracer(domain, integrator, config)
            .run(&[Point3::new(0.1, 0.5, 0.5)], IntegrationDirection::Forward)
            .unwrap();
        let token = &report.finished[0].token;
        let tail = token.tail.as_ref().unwrap();
        assert_eq!(tail.values.len(), layout.width());
        let last = report.segments.last().unwrap().points.last().unwrap();
        assert_eq!(tail, last);
        let time = tail.attribute(&layout, "IntegrationTime").unwrap();
        assert!((time[0] - token.propagation()).abs() < 1e-12);
    }

    /// Integrates nothing and probes back onto its own seed.
    struct Stuck;

    impl Integrator for Stuck {
        fn integrate(&mut self, request: &StepRequest<'_>) -> Segment {
            Segment {
                points: vec![TracePoint::bare(request.seed)],
                step_count: request.step_count,
                propagation: request.propagation,
                reason: TerminationReason::OutOfDomain,
            }
        }

        fn probe(&mut self, from: &TracePoint, _direction: Direction) -> Option<TracePoint> {
            Some(from.clone())
        }
    }

    #[test]
    fn probes_that_stay_local_are_bounded() {
        let config = TracerConfig {
            max_local_retries: 3,
            ..TracerConfig::default()
        };
        let report = solo_tracer(slab(0.0, 1.0), Stuck, config)
            .run(&[Point3::new(0.5, 0.5, 0.5)], IntegrationDirection::Forward)
            .unwrap();
        assert_eq!(report.finished[0].cause, FinishCause::RetryLimit);
        // First attempt plus three re-integrations.
        assert_eq!(report.segments.len(), 4);
    }

    /// Claims progress backwards.
    struct Regressing;

    impl Integrator for Regressing {
        fn integrate(&mut self, request: &StepRequest<'_>) -> Segment {
            Segment {
                points: vec![TracePoint::bare(request.seed)],
                step_count: request.step_count,
                propagation: request.propagation - 1.0,
                reason: TerminationReason::Other,
            }
        }

        fn probe(&mut self, _from: &TracePoint, _direction: Direction) -> Option<TracePoint> {
            None
        }
    }

    #[test]
    fn regressing_integrator_is_an_error() {
        let result = solo_tracer(slab(0.0, 1.0), Regressing, TracerConfig::default())
            .run(&[Point3::new(0.5, 0.5, 0.5)], IntegrationDirection::Forward);
        assert!(matches!(result, Err(TracerError::Integrator(_))));
    }
}
