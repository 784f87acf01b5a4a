//! Collaborator traits the tracer drives but does not implement.
//!
//! The numerical integrator and the AMR block lookup live outside this
//! workspace. The tracer only relies on the contracts documented here.

use crate::direction::{Direction, TerminationReason};
use crate::geometry::Point3;
use crate::id::BlockId;
use crate::token::AmrLocation;
use crate::trace::TracePoint;

/// Input to one integration segment.
#[derive(Clone, Copy, Debug)]
pub struct StepRequest<'a> {
    /// Where to start.
    pub seed: Point3,
    /// Which way to go.
    pub direction: Direction,
    /// Last point of the previous extension, if any.
    pub tail: Option<&'a TracePoint>,
    /// Steps already taken by this trace.
    pub step_count: u64,
    /// Arc length already traversed by this trace.
    pub propagation: f64,
    /// Step limit for the whole trace.
    pub max_steps: u64,
    /// Arc-length limit for the whole trace.
    pub max_propagation: f64,
}

/// Output of one integration segment.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Points produced, starting at the seed. Empty when the integrator
    /// could not start at all.
    pub points: Vec<TracePoint>,
    /// Updated total step count. Never below the request's.
    pub step_count: u64,
    /// Updated total arc length. Never below the request's.
    pub propagation: f64,
    /// Why integration stopped.
    pub reason: TerminationReason,
}

impl Segment {
    /// A segment that made no progress at all.
    pub fn empty(request: &StepRequest<'_>, reason: TerminationReason) -> Self {
        Self {
            points: Vec::new(),
            step_count: request.step_count,
            propagation: request.propagation,
            reason,
        }
    }

    /// Steps contributed by this segment relative to `request`.
    pub fn steps_taken(&self, request: &StepRequest<'_>) -> u64 {
        self.step_count.saturating_sub(request.step_count)
    }
}

/// Integrates one curve segment through the locally owned field.
///
/// Implementations must guarantee monotonic progress: the returned
/// step count and propagation are never below the request's.
pub trait Integrator {
    /// Extend a trace from `request.seed` until it leaves the local
    /// domain or hits a limit.
    fn integrate(&mut self, request: &StepRequest<'_>) -> Segment;

    /// Take one short step from `from` without any domain check, to find
    /// a concrete point past the local partition boundary. Returns `None`
    /// if no step can be taken (for instance a zero field at `from`).
    fn probe(&mut self, from: &TracePoint, direction: Direction) -> Option<TracePoint>;
}

/// Resolves points to AMR blocks.
pub trait BlockSampler {
    /// Level and block containing `point`, searching the whole hierarchy
    /// (not only local blocks). `None` if outside every block.
    fn locate_block(&self, point: &Point3) -> Option<AmrLocation>;

    /// Blocks whose data this rank holds.
    fn local_blocks(&self) -> Vec<BlockId>;
}
