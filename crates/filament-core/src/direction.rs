//! Integration direction and termination reasons.

use smallvec::{smallvec, SmallVec};
use std::fmt;

/// Direction in which one trace is integrated. Immutable per token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Along the field.
    Forward,
    /// Against the field.
    Backward,
}

impl Direction {
    /// `+1.0` for forward, `-1.0` for backward.
    pub fn sign(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Backward => -1.0,
        }
    }

    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::Forward => 0,
            Self::Backward => 1,
        }
    }

    /// Decode a wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Forward),
            1 => Some(Self::Backward),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
        }
    }
}

/// Which directions each seed is expanded into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegrationDirection {
    /// One forward token per seed.
    #[default]
    Forward,
    /// One backward token per seed.
    Backward,
    /// A forward and a backward token per seed, with consecutive ids.
    Both,
}

impl IntegrationDirection {
    /// The token directions for one seed, in id order.
    pub fn directions(self) -> SmallVec<[Direction; 2]> {
        match self {
            Self::Forward => smallvec![Direction::Forward],
            Self::Backward => smallvec![Direction::Backward],
            Self::Both => smallvec![Direction::Forward, Direction::Backward],
        }
    }
}

/// Why the integrator stopped extending a trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerminationReason {
    /// The trace left the locally sampled domain. The only reason that
    /// can lead to a migration.
    OutOfDomain,
    /// The step limit was reached.
    ReachedStepLimit,
    /// The arc-length limit was reached.
    ReachedLengthLimit,
    /// Any other failure (degenerate field, unsupported cell, ...).
    Other,
}

impl TerminationReason {
    /// Whether a trace stopped for this reason may continue elsewhere.
    pub fn allows_migration(self) -> bool {
        matches!(self, Self::OutOfDomain)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfDomain => write!(f, "out of domain"),
            Self::ReachedStepLimit => write!(f, "reached step limit"),
            Self::ReachedLengthLimit => write!(f, "reached length limit"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_codes_round_trip() {
        for d in [Direction::Forward, Direction::Backward] {
            assert_eq!(Direction::from_code(d.code()), Some(d));
        }
        assert_eq!(Direction::from_code(9), None);
    }

    #[test]
    fn both_expands_forward_then_backward() {
        let dirs = IntegrationDirection::Both.directions();
        assert_eq!(dirs.as_slice(), &[Direction::Forward, Direction::Backward]);
        assert_eq!(IntegrationDirection::Backward.directions().len(), 1);
    }

    #[test]
    fn only_out_of_domain_migrates() {
        assert!(TerminationReason::OutOfDomain.allows_migration());
        assert!(!TerminationReason::ReachedStepLimit.allows_migration());
        assert!(!TerminationReason::ReachedLengthLimit.allows_migration());
        assert!(!TerminationReason::Other.allows_migration());
    }
}
