//! Partition ownership lookup for Filament ranks.
//!
//! A [`ProcessLocator`] answers two questions about a point: does this
//! rank own it, and if not, which other rank does. Both locators here
//! build their table once with a collective exchange and are read-only
//! afterwards.
//!
//! - [`BoundingBoxLocator`]: one axis-aligned box per rank, probed in
//!   ring order starting after the caller.
//! - [`AmrBlockLocator`]: a block-to-rank table over an AMR hierarchy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod amr;
pub mod bbox;
pub mod error;
pub mod locator;

pub use amr::AmrBlockLocator;
pub use bbox::BoundingBoxLocator;
pub use error::LocateError;
pub use locator::ProcessLocator;
