//! AMR block-table partition lookup.
//!
//! Ownership is resolved per block rather than per box: the sampler
//! maps a point to the `(level, block)` containing it and the table
//! maps that block to the rank holding its data. The table is built
//! once by gathering every rank's local block list.

use indexmap::IndexMap;

use filament_core::{BlockId, BlockSampler, Point3, Rank, TaskKind, TaskToken};
use filament_transport::Transport;

use crate::error::LocateError;
use crate::locator::ProcessLocator;

/// Block-to-rank ownership over an AMR hierarchy.
pub struct AmrBlockLocator<S> {
    rank: Rank,
    size: usize,
    sampler: S,
    owners: IndexMap<BlockId, Rank>,
}

impl<S: BlockSampler> AmrBlockLocator<S> {
    /// Exchange local block lists with every rank. Collective.
    ///
    /// Fails with [`LocateError::MalformedTable`] if two ranks claim the
    /// same block.
    pub fn initialize<T: Transport>(transport: &mut T, sampler: S) -> Result<Self, LocateError> {
        let local: Vec<u8> = sampler
            .local_blocks()
            .iter()
            .flat_map(|b| b.0.to_le_bytes())
            .collect();
        let gathered = transport.all_gather_bytes(&local)?;

        let mut owners = IndexMap::new();
        for (rank, bytes) in gathered.iter().enumerate() {
            if bytes.len() % 4 != 0 {
                return Err(LocateError::MalformedTable {
                    reason: format!("rank {rank} sent {} block-list bytes", bytes.len()),
                });
            }
            for c in bytes.chunks_exact(4) {
                let block = BlockId(u32::from_le_bytes([c[0], c[1], c[2], c[3]]));
                if let Some(prev) = owners.insert(block, Rank(rank as u32)) {
                    return Err(LocateError::MalformedTable {
                        reason: format!("block {block} claimed by ranks {prev} and {rank}"),
                    });
                }
            }
        }

        let rank = transport.rank();
        tracing::debug!(rank = %rank, blocks = owners.len(), "AMR block table exchanged");
        Ok(Self {
            rank,
            size: gathered.len(),
            sampler,
            owners,
        })
    }

    /// Rank holding `block`, if any rank does.
    pub fn block_owner(&self, block: BlockId) -> Option<Rank> {
        self.owners.get(&block).copied()
    }

    /// The full table, in gather order.
    pub fn table(&self) -> &IndexMap<BlockId, Rank> {
        &self.owners
    }

    fn owner_of(&self, point: &Point3) -> Option<Rank> {
        let loc = self.sampler.locate_block(point)?;
        self.block_owner(loc.block)
    }
}

impl<S: BlockSampler> ProcessLocator for AmrBlockLocator<S> {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn has_local_data(&self) -> bool {
        self.owners.values().any(|r| *r == self.rank)
    }

    fn owns(&self, point: &Point3) -> bool {
        self.owner_of(point) == Some(self.rank)
    }

    fn find_owner(&self, point: &Point3) -> Option<Rank> {
        self.owner_of(point).filter(|r| *r != self.rank)
    }

    fn annotate(&self, token: &mut TaskToken) {
        if let Some(loc) = self.sampler.locate_block(&token.seed) {
            token.kind = TaskKind::Amr(loc);
        }
    }
}
