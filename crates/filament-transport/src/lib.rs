//! Point-to-point and collective transport for Filament ranks.
//!
//! The tracer never talks to a message-passing runtime directly. It
//! goes through the [`Transport`] trait: reliable, in-order,
//! non-blocking sends between a fixed set of ranks, a non-blocking
//! receive into a caller-owned buffer, and a gather collective from
//! which reductions and barriers are derived.
//!
//! [`LocalTransport`] implements the trait for a group of ranks living
//! in one process (one thread per rank), over `crossbeam-channel`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod local;
pub mod transport;

pub use error::TransportError;
pub use local::{LocalSendRequest, LocalTransport};
pub use transport::{Envelope, Request, Transport};
