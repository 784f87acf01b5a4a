//! Core types and traits for the Filament distributed stream tracer.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other crate in the workspace: rank and
//! task identifiers, geometry, the migratable [`TaskToken`], trace points
//! and their tail layout, and the collaborator traits ([`Integrator`],
//! [`BlockSampler`]) that the tracer drives but does not implement.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod direction;
pub mod error;
pub mod geometry;
pub mod id;
pub mod token;
pub mod trace;
pub mod traits;

pub use direction::{Direction, IntegrationDirection, TerminationReason};
pub use error::TokenError;
pub use geometry::{BoundingBox, Point3};
pub use id::{BlockId, Rank, Tag, TaskId};
pub use token::{seed_tokens, AmrLocation, TaskKind, TaskToken};
pub use trace::{AttributeSpec, AttributeValues, TailLayout, TracePoint};
pub use traits::{BlockSampler, Integrator, Segment, StepRequest};
