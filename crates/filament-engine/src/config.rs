//! Tracer configuration, validation, and error types.
//!
//! [`TracerConfig`] is the builder-input for a [`Tracer`](crate::Tracer).
//! [`validate()`](TracerConfig::validate) checks structural invariants
//! before any collective call is made, so a misconfigured rank fails
//! fast instead of deadlocking its peers mid-protocol.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use filament_core::{Tag, TailLayout};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`TracerConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `max_steps` is zero.
    ZeroMaxSteps,
    /// `max_propagation` is NaN, infinite, zero, or negative.
    InvalidMaxPropagation {
        /// The invalid value.
        value: f64,
    },
    /// Poll intervals are zero or inverted.
    InvalidPollInterval {
        /// Description of which invariant was violated.
        reason: String,
    },
    /// `initial_send_buffers` is zero.
    ZeroSendBuffers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroMaxSteps => write!(f, "max_steps must be at least 1"),
            Self::InvalidMaxPropagation { value } => {
                write!(f, "max_propagation must be finite and positive, got {value}")
            }
            Self::InvalidPollInterval { reason } => write!(f, "invalid poll interval: {reason}"),
            Self::ZeroSendBuffers => write!(f, "initial_send_buffers must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

// ── TracerConfig ───────────────────────────────────────────────────

/// Per-run tracer settings. Every rank must use the same values for
/// `tag` and `tail_layout`.
#[derive(Clone, Debug)]
pub struct TracerConfig {
    /// Step limit per trace, across all ranks. Default: 2000.
    pub max_steps: u64,
    /// Arc-length limit per trace, across all ranks. Default: 1e6.
    pub max_propagation: f64,
    /// Consecutive exit probes that may land back inside the local
    /// partition before the task is force-finished. Default: 4.
    pub max_local_retries: u32,
    /// First wait when idle with work outstanding elsewhere. Default: 1ms.
    pub poll_interval: Duration,
    /// Cap on the doubling idle wait. Default: 50ms.
    pub max_poll_interval: Duration,
    /// Send buffers allocated up front; the pool grows on demand.
    /// Default: 4.
    pub initial_send_buffers: usize,
    /// Tag reserved for this protocol on the transport.
    pub tag: Tag,
    /// Attribute arrays carried by every trace point and tail.
    pub tail_layout: TailLayout,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            max_steps: 2000,
            max_propagation: 1.0e6,
            max_local_retries: 4,
            poll_interval: Duration::from_millis(1),
            max_poll_interval: Duration::from_millis(50),
            initial_send_buffers: 4,
            tag: Tag::STREAM_TRACE,
            tail_layout: TailLayout::empty(),
        }
    }
}

impl TracerConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroMaxSteps);
        }
        if !self.max_propagation.is_finite() || self.max_propagation <= 0.0 {
            return Err(ConfigError::InvalidMaxPropagation {
                value: self.max_propagation,
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidPollInterval {
                reason: "poll_interval must be non-zero".into(),
            });
        }
        if self.max_poll_interval < self.poll_interval {
            return Err(ConfigError::InvalidPollInterval {
                reason: format!(
                    "max_poll_interval {:?} is below poll_interval {:?}",
                    self.max_poll_interval, self.poll_interval
                ),
            });
        }
        if self.initial_send_buffers == 0 {
            return Err(ConfigError::ZeroSendBuffers);
        }
        Ok(())
    }
}
