//! Error types for the task manager and tracer.
//!
//! [`ProtocolError`] covers contract violations between ranks. They
//! indicate a bug in routing or leader election, never a recoverable
//! runtime condition, and callers are expected to abort the group.

use std::error::Error;
use std::fmt;

use filament_core::{Rank, TaskId, TokenError};
use filament_locate::LocateError;
use filament_transport::TransportError;
use filament_wire::WireError;

use crate::config::ConfigError;

/// A violated invariant of the tracing protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// `next_task` or `hand_back` called before `initialize`.
    NotInitialized,
    /// `initialize` called twice.
    AlreadyInitialized,
    /// A seed id exceeds the `max_seed_id` every rank agreed on.
    SeedIdOutOfRange {
        /// The offending task.
        task: TaskId,
        /// The agreed maximum.
        max_seed_id: u64,
    },
    /// `max_seed_id` needs an ownership table larger than `limit` entries.
    SeedTableTooLarge {
        /// The requested maximum id.
        max_seed_id: u64,
        /// Largest supported table length.
        limit: usize,
    },
    /// A finish report reached a rank that is not the leader.
    TaskFinishedAtNonLeader {
        /// The reported task.
        task: TaskId,
        /// The reporting rank.
        from: Rank,
    },
    /// The leader received a termination notice.
    NoMoreTasksAtLeader {
        /// The sending rank.
        from: Rank,
    },
    /// A termination notice arrived while this rank still held work.
    NoMoreTasksWithWork {
        /// Tasks pending or active on this rank.
        outstanding: usize,
    },
    /// A task arrived after global termination was processed.
    NewTaskAfterNoMoreTasks {
        /// The late task.
        task: TaskId,
        /// The sending rank.
        from: Rank,
    },
    /// A task arrived that this rank already holds.
    DuplicateTask {
        /// The duplicated task.
        task: TaskId,
    },
    /// A task was handed back that was not handed out.
    UnexpectedHandBack {
        /// The unknown task.
        task: TaskId,
    },
    /// More finish reports arrived than tasks were counted.
    CounterUnderflow {
        /// The report that underflowed.
        task: TaskId,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "task manager used before initialize"),
            Self::AlreadyInitialized => write!(f, "task manager initialized twice"),
            Self::SeedIdOutOfRange { task, max_seed_id } => {
                write!(f, "seed id {task} exceeds max_seed_id {max_seed_id}")
            }
            Self::SeedTableTooLarge { max_seed_id, limit } => {
                write!(f, "max_seed_id {max_seed_id} exceeds the {limit}-entry ownership table")
            }
            Self::TaskFinishedAtNonLeader { task, from } => {
                write!(f, "finish report for task {task} from rank {from} reached a non-leader")
            }
            Self::NoMoreTasksAtLeader { from } => {
                write!(f, "leader received NoMoreTasks from rank {from}")
            }
            Self::NoMoreTasksWithWork { outstanding } => {
                write!(f, "NoMoreTasks received with {outstanding} tasks outstanding")
            }
            Self::NewTaskAfterNoMoreTasks { task, from } => {
                write!(f, "task {task} from rank {from} arrived after NoMoreTasks")
            }
            Self::DuplicateTask { task } => write!(f, "task {task} is already held here"),
            Self::UnexpectedHandBack { task } => {
                write!(f, "task {task} handed back but was never handed out")
            }
            Self::CounterUnderflow { task } => {
                write!(f, "finish report for task {task} underflowed the task counter")
            }
        }
    }
}

impl Error for ProtocolError {}

/// Any failure of a tracer run.
#[derive(Debug)]
pub enum TracerError {
    /// Invalid configuration.
    Config(ConfigError),
    /// The transport failed.
    Transport(TransportError),
    /// A message could not be encoded or decoded.
    Wire(WireError),
    /// The ownership table could not be built.
    Locate(LocateError),
    /// A protocol invariant was violated.
    Protocol(ProtocolError),
    /// The integrator broke a token invariant (for instance regressed
    /// the step count, or emitted points with the wrong attribute width).
    Integrator(TokenError),
}

impl fmt::Display for TracerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Wire(e) => write!(f, "wire: {e}"),
            Self::Locate(e) => write!(f, "locate: {e}"),
            Self::Protocol(e) => write!(f, "protocol violation: {e}"),
            Self::Integrator(e) => write!(f, "integrator: {e}"),
        }
    }
}

impl Error for TracerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::Wire(e) => Some(e),
            Self::Locate(e) => Some(e),
            Self::Protocol(e) => Some(e),
            Self::Integrator(e) => Some(e),
        }
    }
}

impl From<ConfigError> for TracerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<TransportError> for TracerError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<WireError> for TracerError {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

impl From<LocateError> for TracerError {
    fn from(e: LocateError) -> Self {
        Self::Locate(e)
    }
}

impl From<ProtocolError> for TracerError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<TokenError> for TracerError {
    fn from(e: TokenError) -> Self {
        Self::Integrator(e)
    }
}
