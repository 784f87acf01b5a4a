//! Task manager and trace orchestrator for distributed stream tracing.
//!
//! One [`Tracer`] runs per rank. It pulls tasks from its
//! [`TaskManager`], extends each one through the local [`Integrator`],
//! and hands it back; the manager then migrates the task to the rank
//! owning its new seed, or reports it finished to the leader. The
//! leader counts outstanding tasks and broadcasts global termination.
//!
//! ```text
//! Tracer::run
//!   └── loop TaskManager::next_task()
//!         ├── flush hand-backs: migrate (NewTask) / finish (TaskFinished)
//!         ├── drain inbox: NewTask, TaskFinished (leader), NoMoreTasks
//!         ├── pop pending → return task
//!         └── counter == 0 → broadcast NoMoreTasks (leader), return None
//! ```
//!
//! [`Integrator`]: filament_core::Integrator

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod pool;
pub mod tracer;

pub use config::{ConfigError, TracerConfig};
pub use error::{ProtocolError, TracerError};
pub use manager::{Disposition, FinishCause, FinishedTask, InitSummary, TaskManager};
pub use metrics::ManagerMetrics;
pub use pool::{SendPool, SlotId};
pub use tracer::{RunReport, TraceSegment, Tracer};
