//! The migratable task token: all mutable state of one in-flight trace.
//!
//! A token exists on at most one rank at a time. Its accumulators only
//! move forward; [`TaskToken::advance`] is the sole way to change them
//! after construction.

use crate::direction::{Direction, IntegrationDirection};
use crate::error::TokenError;
use crate::geometry::Point3;
use crate::id::{BlockId, Rank, TaskId};
use crate::trace::{TailLayout, TracePoint};

/// AMR block currently containing a token's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AmrLocation {
    /// Refinement level.
    pub level: u32,
    /// Global block id.
    pub block: BlockId,
}

/// Variant payload of a token. The protocol treats both kinds the same
/// and only dispatches on the tag when encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TaskKind {
    /// Routed by bounding boxes alone.
    #[default]
    Plain,
    /// Routed through an AMR block table.
    Amr(AmrLocation),
}

impl TaskKind {
    /// The AMR payload, if any.
    pub fn amr(&self) -> Option<AmrLocation> {
        match self {
            Self::Plain => None,
            Self::Amr(loc) => Some(*loc),
        }
    }
}

/// State of one trace that migrates between ranks.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskToken {
    id: TaskId,
    /// Starting point of the next integration segment.
    pub seed: Point3,
    direction: Direction,
    step_count: u64,
    propagation: f64,
    num_hops: u32,
    /// Best known owner of `seed`; `None` means unknown.
    pub owner_hint: Option<Rank>,
    /// Last point of the most recent extension. `None` only for a seed
    /// that has never been extended.
    pub tail: Option<TracePoint>,
    /// Routing payload.
    pub kind: TaskKind,
}

impl TaskToken {
    /// A fresh token at its seed point.
    pub fn new(id: TaskId, seed: Point3, direction: Direction) -> Self {
        Self {
            id,
            seed,
            direction,
            step_count: 0,
            propagation: 0.0,
            num_hops: 0,
            owner_hint: None,
            tail: None,
            kind: TaskKind::Plain,
        }
    }

    /// Restore accumulated progress on a token being rebuilt from the
    /// wire. Not a substitute for [`advance`](Self::advance).
    pub fn with_progress(mut self, step_count: u64, propagation: f64, num_hops: u32) -> Self {
        self.step_count = step_count;
        self.propagation = propagation;
        self.num_hops = num_hops;
        self
    }

    /// Stable identity.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Integration direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Steps taken so far, across all ranks.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Arc length traversed so far, across all ranks.
    pub fn propagation(&self) -> f64 {
        self.propagation
    }

    /// Number of migrations so far.
    pub fn num_hops(&self) -> u32 {
        self.num_hops
    }

    /// Move the accumulators forward. Rejects any regression (and NaN
    /// arc lengths) without modifying the token.
    pub fn advance(&mut self, step_count: u64, propagation: f64) -> Result<(), TokenError> {
        if step_count < self.step_count {
            return Err(TokenError::StepCountRegressed {
                task: self.id,
                current: self.step_count,
                proposed: step_count,
            });
        }
        if !(propagation >= self.propagation) {
            return Err(TokenError::PropagationRegressed {
                task: self.id,
                current: self.propagation,
                proposed: propagation,
            });
        }
        self.step_count = step_count;
        self.propagation = propagation;
        Ok(())
    }

    /// Record a handoff to `dest`.
    pub fn record_hop(&mut self, dest: Rank) {
        self.num_hops += 1;
        self.owner_hint = Some(dest);
    }

    /// Check the tail against the run's layout.
    pub fn check_tail(&self, layout: &TailLayout) -> Result<(), TokenError> {
        match &self.tail {
            Some(t) if t.values.len() != layout.width() => Err(TokenError::TailWidthMismatch {
                task: self.id,
                expected: layout.width(),
                found: t.values.len(),
            }),
            _ => Ok(()),
        }
    }
}

/// Expand seed points into tokens.
///
/// Seed `i` gets ids `i * k .. i * k + k` where `k` is the number of
/// directions, so ids are dense and identical on every rank holding the
/// same seed list.
pub fn seed_tokens(points: &[Point3], directions: IntegrationDirection) -> Vec<TaskToken> {
    let dirs = directions.directions();
    let k = dirs.len() as u64;
    points
        .iter()
        .enumerate()
        .flat_map(|(i, p)| {
            dirs.iter()
                .enumerate()
                .map(move |(j, d)| TaskToken::new(TaskId(i as u64 * k + j as u64), *p, *d))
        })
        .collect()
}
