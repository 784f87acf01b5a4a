//! Filament: distributed stream tracing over a partitioned dataset.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Filament sub-crates. For most users, adding `filament` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use filament::prelude::*;
//! use filament::transport::LocalTransport;
//!
//! // An integrator that never gets anywhere.
//! struct Still;
//! impl Integrator for Still {
//!     fn integrate(&mut self, request: &StepRequest<'_>) -> Segment {
//!         Segment::empty(request, TerminationReason::Other)
//!     }
//!     fn probe(&mut self, _from: &TracePoint, _direction: Direction) -> Option<TracePoint> {
//!         None
//!     }
//! }
//!
//! // One rank owning the unit cube.
//! let transport = LocalTransport::group(1).remove(0);
//! let cube = BoundingBox::new(Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0)).unwrap();
//! let locator = BoundingBoxLocator::from_table(Rank(0), vec![Some(cube)]);
//!
//! let tracer = Tracer::new(transport, locator, Still, TracerConfig::default()).unwrap();
//! let report = tracer
//!     .run(&[Point3::new(0.5, 0.5, 0.5)], IntegrationDirection::Forward)
//!     .unwrap();
//! assert_eq!(report.total_tasks, 1);
//! assert_eq!(report.finished[0].cause, FinishCause::NoExtension);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `filament-core` | IDs, geometry, task tokens, collaborator traits |
//! | [`transport`] | `filament-transport` | Transport trait and in-process transport |
//! | [`wire`] | `filament-wire` | Binary codec for tokens and control messages |
//! | [`locate`] | `filament-locate` | Bounding-box and AMR ownership lookup |
//! | [`engine`] | `filament-engine` | Task manager, tracer, config, and metrics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`filament-core`).
///
/// Implement [`types::Integrator`] (and [`types::BlockSampler`] for AMR
/// data) to plug a numerical integrator into the tracer.
pub use filament_core as types;

/// Point-to-point and collective messaging (`filament-transport`).
///
/// [`transport::LocalTransport`] runs a whole rank group in one process.
pub use filament_transport as transport;

/// Binary wire codec (`filament-wire`).
pub use filament_wire as wire;

/// Partition ownership lookup (`filament-locate`).
pub use filament_locate as locate;

/// Task manager and trace orchestrator (`filament-engine`).
pub use filament_engine as engine;

/// Common imports for typical Filament usage.
///
/// ```rust
/// use filament::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use filament_core::{
        BlockSampler, BoundingBox, Direction, IntegrationDirection, Integrator, Point3, Rank,
        Segment, StepRequest, TailLayout, TaskId, TaskToken, TerminationReason, TracePoint,
    };

    // Transport and ownership
    pub use filament_locate::{AmrBlockLocator, BoundingBoxLocator, ProcessLocator};
    pub use filament_transport::Transport;

    // Errors
    pub use filament_engine::{ConfigError, ProtocolError, TracerError};

    // Engine
    pub use filament_engine::{
        FinishCause, ManagerMetrics, RunReport, TraceSegment, Tracer, TracerConfig,
    };
}
