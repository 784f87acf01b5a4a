//! Error types for task-token state transitions.

use std::error::Error;
use std::fmt;

use crate::id::TaskId;

/// A task-token update that would break one of its invariants.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenError {
    /// An update tried to lower the accumulated step count.
    StepCountRegressed {
        /// The token.
        task: TaskId,
        /// Count before the update.
        current: u64,
        /// Rejected new count.
        proposed: u64,
    },
    /// An update tried to lower the accumulated arc length.
    PropagationRegressed {
        /// The token.
        task: TaskId,
        /// Arc length before the update.
        current: f64,
        /// Rejected new arc length.
        proposed: f64,
    },
    /// A tail point does not match the run's attribute layout.
    TailWidthMismatch {
        /// The token.
        task: TaskId,
        /// Width required by the layout.
        expected: usize,
        /// Width of the offered tail.
        found: usize,
    },
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepCountRegressed {
                task,
                current,
                proposed,
            } => write!(
                f,
                "task {task}: step count would regress from {current} to {proposed}"
            ),
            Self::PropagationRegressed {
                task,
                current,
                proposed,
            } => write!(
                f,
                "task {task}: propagation would regress from {current} to {proposed}"
            ),
            Self::TailWidthMismatch {
                task,
                expected,
                found,
            } => write!(
                f,
                "task {task}: tail has {found} values, layout requires {expected}"
            ),
        }
    }
}

impl Error for TokenError {}
