//! The [`Transport`] trait.

use std::time::Duration;

use filament_core::{Rank, Tag};

use crate::error::TransportError;

/// Completion handle of a non-blocking operation.
pub trait Request {
    /// Whether the operation has completed. A send buffer must not be
    /// reused until this returns `true`.
    fn is_complete(&self) -> bool;
}

/// Metadata of one received message. The payload itself has been copied
/// into the caller's buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Sending rank.
    pub source: Rank,
    /// Payload length in bytes.
    pub len: usize,
}

/// Reliable, in-order messaging between a fixed group of ranks.
///
/// Point-to-point operations are tag-filtered: a receive for one tag
/// never consumes a message sent with another. Collective operations
/// must be entered by every rank of the group in the same order.
pub trait Transport {
    /// Completion handle for [`isend`](Self::isend).
    type SendRequest: Request;

    /// This rank.
    fn rank(&self) -> Rank;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Start sending `bytes` to `dest`. Returns immediately.
    fn isend(
        &mut self,
        dest: Rank,
        tag: Tag,
        bytes: &[u8],
    ) -> Result<Self::SendRequest, TransportError>;

    /// Receive one message with `tag` from any rank into `buf`, if one
    /// is already available.
    fn try_recv(&mut self, tag: Tag, buf: &mut [u8]) -> Result<Option<Envelope>, TransportError>;

    /// Like [`try_recv`](Self::try_recv), but waits up to `timeout` for
    /// a message to arrive.
    fn recv_timeout(
        &mut self,
        tag: Tag,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<Envelope>, TransportError>;

    /// Gather one byte string from every rank, indexed by rank.
    fn all_gather_bytes(&mut self, local: &[u8]) -> Result<Vec<Vec<u8>>, TransportError>;

    /// Block until every rank has entered the barrier.
    fn barrier(&mut self) -> Result<(), TransportError> {
        self.all_gather_bytes(&[]).map(|_| ())
    }

    /// Gather a slice of `f64` from every rank, indexed by rank.
    fn all_gather_f64(&mut self, local: &[f64]) -> Result<Vec<Vec<f64>>, TransportError> {
        let bytes: Vec<u8> = local.iter().flat_map(|v| v.to_le_bytes()).collect();
        let gathered = self.all_gather_bytes(&bytes)?;
        gathered
            .into_iter()
            .map(|b| {
                if b.len() % 8 != 0 {
                    return Err(TransportError::CollectiveFailed {
                        reason: format!("f64 gather received {} bytes", b.len()),
                    });
                }
                Ok(b.chunks_exact(8)
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect())
            })
            .collect()
    }

    /// Element-wise maximum of `values` across all ranks, written back
    /// in place on every rank.
    fn all_reduce_max_i32(&mut self, values: &mut [i32]) -> Result<(), TransportError> {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let gathered = self.all_gather_bytes(&bytes)?;
        for (rank, contribution) in gathered.iter().enumerate() {
            if contribution.len() != bytes.len() {
                return Err(TransportError::CollectiveFailed {
                    reason: format!(
                        "rank {rank} contributed {} bytes to a reduction of {}",
                        contribution.len(),
                        bytes.len()
                    ),
                });
            }
            for (v, c) in values.iter_mut().zip(contribution.chunks_exact(4)) {
                *v = (*v).max(i32::from_le_bytes([c[0], c[1], c[2], c[3]]));
            }
        }
        Ok(())
    }
}
