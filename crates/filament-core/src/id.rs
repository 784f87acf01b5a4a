//! Strongly-typed identifiers for ranks, tasks, AMR blocks and message tags.

use std::fmt;

/// Identifies one participating process in a fixed-size computation.
///
/// Ranks are dense: a group of `n` processes uses `Rank(0)..Rank(n - 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(pub u32);

impl Rank {
    /// The rank as a `usize` index into per-rank tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The next rank in ring order, wrapping at `size`.
    pub fn next_in_ring(self, size: usize) -> Rank {
        Rank(((self.index() + 1) % size.max(1)) as u32)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Rank {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Stable identity of one trace.
///
/// Assigned once when the seed is expanded into tokens and never reused
/// within a computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl TaskId {
    /// The id as a `usize` index into per-seed tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Global identifier of an AMR block, unique across all refinement levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BlockId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Logical message tag reserved for one protocol on a shared transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag(pub u32);

impl Tag {
    /// The tag carried by every stream-tracer control message.
    pub const STREAM_TRACE: Tag = Tag(561);
}

impl Default for Tag {
    fn default() -> Self {
        Self::STREAM_TRACE
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_successor_wraps() {
        assert_eq!(Rank(0).next_in_ring(3), Rank(1));
        assert_eq!(Rank(2).next_in_ring(3), Rank(0));
        assert_eq!(Rank(0).next_in_ring(1), Rank(0));
    }

    #[test]
    fn ids_display_as_plain_numbers() {
        assert_eq!(Rank(7).to_string(), "7");
        assert_eq!(TaskId(42).to_string(), "42");
        assert_eq!(BlockId(3).to_string(), "3");
    }
}
