//! Binary wire codec for Filament task tokens and control messages.
//!
//! Every control message is written into a buffer pre-sized to the
//! largest message possible for the run, which depends only on the
//! tail attribute layout.
//!
//! # Format
//!
//! All integers and floats are little-endian. There is no versioning:
//! sender and receiver always run the same build within one computation.
//!
//! ```text
//! [msg_type i32] [sender i32] [payload]
//!
//! NewTask payload:
//!   [id u64] [seed 3×f64] [direction u8] [step_count u64]
//!   [propagation f64] [num_hops u32] [owner_hint i32, -1 = unknown]
//!   [kind u8] ([level u32] [block u32] if kind == AMR)
//!   [has_tail u8] ([position 3×f64] [count u32] [values count×f64] if has_tail)
//!
//! TaskFinished payload:
//!   [id u64]
//!
//! NoMoreTasks payload: none
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod message;
pub mod token;

pub use codec::{WireReader, WireWriter};
pub use error::WireError;
pub use message::{decode_message, encode_message, message_capacity, ControlMessage, MessageType};
pub use token::{decode_token, encode_token, max_token_len};
