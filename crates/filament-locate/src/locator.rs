//! The [`ProcessLocator`] trait.

use filament_core::{Point3, Rank, TaskToken};

/// Read-only ownership lookup shared by the task manager and the tracer.
///
/// `find_owner` must be a pure function of the table and the point:
/// two calls with the same point return the same answer.
pub trait ProcessLocator {
    /// The calling rank.
    fn rank(&self) -> Rank;

    /// Group size.
    fn size(&self) -> usize;

    /// Whether the calling rank holds any data.
    fn has_local_data(&self) -> bool;

    /// Whether `point` lies in the calling rank's partition.
    fn owns(&self, point: &Point3) -> bool;

    /// Some other rank whose partition contains `point`, or `None` when
    /// no other rank claims it. `None` is a normal outcome: the point may
    /// be outside the whole domain or in a gap between partitions.
    fn find_owner(&self, point: &Point3) -> Option<Rank>;

    /// Refresh any routing payload the token carries for its current
    /// seed. The default does nothing.
    fn annotate(&self, _token: &mut TaskToken) {}
}
