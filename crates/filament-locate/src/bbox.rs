//! Bounding-box partition lookup.

use filament_core::{BoundingBox, Point3, Rank};
use filament_transport::Transport;

use crate::error::LocateError;
use crate::locator::ProcessLocator;

/// One inclusive box per rank; `None` for ranks without data.
///
/// Every rank holds an identical copy of the table after
/// [`initialize`](Self::initialize).
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBoxLocator {
    rank: Rank,
    boxes: Vec<Option<BoundingBox>>,
}

impl BoundingBoxLocator {
    /// Exchange local boxes with every rank. Collective: all ranks must
    /// call it, including ranks without data (`local == None`).
    pub fn initialize<T: Transport>(
        transport: &mut T,
        local: Option<BoundingBox>,
    ) -> Result<Self, LocateError> {
        let flat = BoundingBox::to_flat(local.as_ref());
        let gathered = transport.all_gather_f64(&flat)?;
        let boxes = gathered
            .iter()
            .enumerate()
            .map(|(rank, values)| {
                let arr: &[f64; BoundingBox::FLAT_LEN] =
                    values.as_slice().try_into().map_err(|_| LocateError::MalformedTable {
                        reason: format!("rank {rank} sent {} box values", values.len()),
                    })?;
                Ok(BoundingBox::from_flat(arr))
            })
            .collect::<Result<Vec<_>, LocateError>>()?;

        let rank = transport.rank();
        tracing::debug!(
            rank = %rank,
            ranks_with_data = boxes.iter().filter(|b| b.is_some()).count(),
            "bounding-box table exchanged"
        );
        Ok(Self { rank, boxes })
    }

    /// Build a locator from an already known table.
    ///
    /// # Panics
    ///
    /// Panics if `rank` is not an index into `boxes`.
    pub fn from_table(rank: Rank, boxes: Vec<Option<BoundingBox>>) -> Self {
        assert!(
            rank.index() < boxes.len(),
            "rank {rank} outside a table of {} boxes",
            boxes.len()
        );
        Self { rank, boxes }
    }

    /// The full table, indexed by rank.
    pub fn table(&self) -> &[Option<BoundingBox>] {
        &self.boxes
    }

    /// The calling rank's box.
    pub fn local_box(&self) -> Option<&BoundingBox> {
        self.boxes[self.rank.index()].as_ref()
    }
}

impl ProcessLocator for BoundingBoxLocator {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.boxes.len()
    }

    fn has_local_data(&self) -> bool {
        self.local_box().is_some()
    }

    fn owns(&self, point: &Point3) -> bool {
        self.local_box().is_some_and(|b| b.contains(point))
    }

    fn find_owner(&self, point: &Point3) -> Option<Rank> {
        let n = self.boxes.len();
        (1..n)
            .map(|offset| (self.rank.index() + offset) % n)
            .find(|&r| self.boxes[r].is_some_and(|b| b.contains(point)))
            .map(|r| Rank(r as u32))
    }
}
