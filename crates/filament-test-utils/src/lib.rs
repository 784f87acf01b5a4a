//! Test utilities and mock collaborators for Filament development.
//!
//! Provides a thread-per-rank harness over [`LocalTransport`]
//! ([`run_ranks`]), an analytic [`UniformFlowIntegrator`], and a
//! [`StripSampler`] that lays AMR blocks out as unit slabs along x.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;
use std::thread;

use smallvec::SmallVec;

use filament_core::{
    AmrLocation, BlockId, BlockSampler, BoundingBox, Direction, Integrator, Point3, Segment,
    StepRequest, TailLayout, TerminationReason, TracePoint,
};
use filament_transport::LocalTransport;

// ── Harness ────────────────────────────────────────────────────────

/// Run `f` once per rank of a fresh `size`-rank group, one thread each.
/// Results are returned in rank order.
///
/// # Panics
///
/// Re-raises the panic of any rank thread.
pub fn run_ranks<R, F>(size: usize, f: F) -> Vec<R>
where
    R: Send + 'static,
    F: Fn(LocalTransport) -> R + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let handles: Vec<_> = LocalTransport::group(size)
        .into_iter()
        .map(|t| {
            let f = Arc::clone(&f);
            thread::spawn(move || f(t))
        })
        .collect();
    handles
        .into_iter()
        .map(|h| match h.join() {
            Ok(r) => r,
            Err(panic) => std::panic::resume_unwind(panic),
        })
        .collect()
}

/// Unit-height box spanning `[x0, x1]` along x and `[0, 1]` along y and z.
///
/// # Panics
///
/// Panics if `x0 > x1`.
pub fn slab(x0: f64, x1: f64) -> BoundingBox {
    BoundingBox::new(Point3::new(x0, 0.0, 0.0), Point3::new(x1, 1.0, 1.0))
        .unwrap_or_else(|| panic!("invalid slab [{x0}, {x1}]"))
}

// ── Integrator ─────────────────────────────────────────────────────

/// Fixed-step integrator through a constant velocity field defined
/// inside `domain` only.
///
/// Every point carries the tail layout's values: zero everywhere except
/// `IntegrationTime`, which is arc length divided by speed.
#[derive(Clone, Debug)]
pub struct UniformFlowIntegrator {
    velocity: Point3,
    step_size: f64,
    domain: BoundingBox,
    layout: TailLayout,
}

impl UniformFlowIntegrator {
    pub fn new(velocity: Point3, step_size: f64, domain: BoundingBox) -> Self {
        Self {
            velocity,
            step_size,
            domain,
            layout: TailLayout::empty(),
        }
    }

    /// Emit attribute values for `layout` on every point.
    pub fn with_layout(mut self, layout: TailLayout) -> Self {
        self.layout = layout;
        self
    }

    fn unit_step(&self, direction: Direction) -> Option<Point3> {
        let speed = self.velocity.norm();
        (speed > 0.0).then(|| self.velocity * (direction.sign() * self.step_size / speed))
    }

    fn point_at(&self, position: Point3, propagation: f64) -> TracePoint {
        let mut values: SmallVec<[f64; 8]> = SmallVec::from_elem(0.0, self.layout.width());
        if let Some((offset, _)) = self.layout.locate("IntegrationTime") {
            values[offset] = propagation / self.velocity.norm();
        }
        TracePoint::new(position, values)
    }
}

impl Integrator for UniformFlowIntegrator {
    fn integrate(&mut self, request: &StepRequest<'_>) -> Segment {
        let Some(step) = self.unit_step(request.direction) else {
            return Segment::empty(request, TerminationReason::Other);
        };
        if !self.domain.contains(&request.seed) {
            return Segment::empty(request, TerminationReason::OutOfDomain);
        }

        let mut position = request.seed;
        let mut steps = request.step_count;
        let mut propagation = request.propagation;
        let mut points = vec![self.point_at(position, propagation)];
        let reason = loop {
            if steps >= request.max_steps {
                break TerminationReason::ReachedStepLimit;
            }
            if propagation + self.step_size > request.max_propagation {
                break TerminationReason::ReachedLengthLimit;
            }
            let next = position + step;
            if !self.domain.contains(&next) {
                break TerminationReason::OutOfDomain;
            }
            position = next;
            steps += 1;
            propagation += self.step_size;
            points.push(self.point_at(position, propagation));
        };
        Segment {
            points,
            step_count: steps,
            propagation,
            reason,
        }
    }

    fn probe(&mut self, from: &TracePoint, direction: Direction) -> Option<TracePoint> {
        let step = self.unit_step(direction)?;
        let mut exit = from.clone();
        exit.position = from.position + step;
        if let Some((offset, _)) = self.layout.locate("IntegrationTime") {
            exit.values[offset] += self.step_size / self.velocity.norm();
        }
        Some(exit)
    }
}

// ── AMR sampler ────────────────────────────────────────────────────

/// Level-0 blocks of unit width along x: block `i` covers `[i, i + 1)`.
#[derive(Clone, Debug)]
pub struct StripSampler {
    blocks: u32,
    local: Vec<BlockId>,
}

impl StripSampler {
    /// `blocks` blocks in total, of which `local` are held by this rank.
    pub fn new(blocks: u32, local: impl IntoIterator<Item = u32>) -> Self {
        Self {
            blocks,
            local: local.into_iter().map(BlockId).collect(),
        }
    }

    /// Union of the local blocks, for a matching integrator domain.
    pub fn local_extent(&self) -> Option<BoundingBox> {
        let lo = self.local.iter().map(|b| b.0).min()?;
        let hi = self.local.iter().map(|b| b.0).max()?;
        BoundingBox::new(
            Point3::new(f64::from(lo), 0.0, 0.0),
            Point3::new(f64::from(hi + 1), 1.0, 1.0),
        )
    }
}

impl BlockSampler for StripSampler {
    fn locate_block(&self, point: &Point3) -> Option<AmrLocation> {
        let i = point.x().floor();
        (i >= 0.0 && i < f64::from(self.blocks)).then(|| AmrLocation {
            level: 0,
            block: BlockId(i as u32),
        })
    }

    fn local_blocks(&self) -> Vec<BlockId> {
        self.local.clone()
    }
}
