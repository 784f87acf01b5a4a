//! Error types for locator initialization.

use std::error::Error;
use std::fmt;

use filament_transport::TransportError;

/// Errors building a locator table.
#[derive(Clone, Debug, PartialEq)]
pub enum LocateError {
    /// The table exchange failed.
    Transport(TransportError),
    /// A gathered contribution could not be decoded.
    MalformedTable {
        /// What was wrong.
        reason: String,
    },
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::MalformedTable { reason } => write!(f, "malformed ownership table: {reason}"),
        }
    }
}

impl Error for LocateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::MalformedTable { .. } => None,
        }
    }
}

impl From<TransportError> for LocateError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}
