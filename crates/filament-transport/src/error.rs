//! Transport error types.

use std::error::Error;
use std::fmt;

use filament_core::Rank;

/// Failures of the underlying transport.
///
/// The tracer treats all of these as fatal: it neither retries nor
/// times out individual messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The peer's endpoint is gone.
    Disconnected {
        /// The unreachable rank.
        peer: u32,
    },
    /// A rank outside the group was addressed.
    InvalidRank {
        /// The offending rank.
        rank: Rank,
        /// Group size.
        size: usize,
    },
    /// An incoming message does not fit the receive buffer.
    MessageTooLarge {
        /// Message length in bytes.
        len: usize,
        /// Receive buffer capacity in bytes.
        capacity: usize,
    },
    /// A collective operation could not complete.
    CollectiveFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected { peer } => write!(f, "rank {peer} is disconnected"),
            Self::InvalidRank { rank, size } => {
                write!(f, "rank {rank} is outside a group of {size}")
            }
            Self::MessageTooLarge { len, capacity } => {
                write!(f, "message of {len} bytes exceeds receive buffer of {capacity}")
            }
            Self::CollectiveFailed { reason } => write!(f, "collective failed: {reason}"),
        }
    }
}

impl Error for TransportError {}
