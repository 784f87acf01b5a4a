//! Error types for the wire codec.

use std::fmt;

/// Errors from encoding into or decoding from a wire buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireError {
    /// The pre-sized buffer is too small for the value being written.
    BufferOverflow {
        /// Bytes the write needed.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },
    /// The message ended before a complete value could be read.
    Truncated {
        /// Bytes the read needed.
        needed: usize,
        /// Bytes left in the message.
        available: usize,
    },
    /// The message type tag is not recognized.
    UnknownMessageType {
        /// The unrecognized tag.
        tag: i32,
    },
    /// A field decoded to a value outside its domain.
    InvalidField {
        /// Which field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferOverflow { needed, available } => {
                write!(f, "buffer overflow: need {needed} bytes, {available} available")
            }
            Self::Truncated { needed, available } => {
                write!(f, "truncated message: need {needed} bytes, {available} available")
            }
            Self::UnknownMessageType { tag } => write!(f, "unknown message type {tag}"),
            Self::InvalidField { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl std::error::Error for WireError {}
