//! In-process transport: one [`LocalTransport`] per rank, one thread
//! per rank, messages over `crossbeam-channel`.
//!
//! Each rank owns an unbounded inbox. Sends copy the payload into the
//! channel and hand back a request that completes once the receiver has
//! copied the payload out, so a send-buffer pool sees the same
//! "in flight until matched" lifetime it would see on a real
//! message-passing runtime.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use filament_core::{Rank, Tag};

use crate::error::TransportError;
use crate::transport::{Envelope, Request, Transport};

struct Message {
    source: Rank,
    tag: Tag,
    payload: Vec<u8>,
    delivered: Arc<AtomicBool>,
}

/// Rendezvous state for gather collectives.
///
/// Every rank writes its slot, waits, reads all slots, then waits again
/// so that no rank can overwrite a slot for the next collective while a
/// slower rank is still reading the current one.
struct CollectiveHub {
    slots: Mutex<Vec<Vec<u8>>>,
    barrier: Barrier,
}

/// Completion handle for [`LocalTransport::isend`].
#[derive(Clone, Debug)]
pub struct LocalSendRequest {
    delivered: Arc<AtomicBool>,
}

impl Request for LocalSendRequest {
    fn is_complete(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }
}

/// One rank's endpoint in an in-process group.
pub struct LocalTransport {
    rank: Rank,
    peers: Vec<Sender<Message>>,
    inbox: Receiver<Message>,
    /// Messages that arrived with a tag nobody has asked for yet.
    deferred: VecDeque<Message>,
    hub: Arc<CollectiveHub>,
}

// Compile-time assertion: endpoints move into rank threads.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<LocalTransport>();
};

impl LocalTransport {
    /// Create a fully connected group of `size` endpoints, indexed by rank.
    ///
    /// # Panics
    ///
    /// Panics if `size == 0`.
    pub fn group(size: usize) -> Vec<LocalTransport> {
        assert!(size > 0, "a transport group needs at least one rank");
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..size).map(|_| crossbeam_channel::unbounded()).unzip();
        let hub = Arc::new(CollectiveHub {
            slots: Mutex::new(vec![Vec::new(); size]),
            barrier: Barrier::new(size),
        });
        receivers
            .into_iter()
            .enumerate()
            .map(|(i, inbox)| LocalTransport {
                rank: Rank(i as u32),
                peers: senders.clone(),
                inbox,
                deferred: VecDeque::new(),
                hub: Arc::clone(&hub),
            })
            .collect()
    }

    fn deliver(&mut self, msg: Message, buf: &mut [u8]) -> Result<Envelope, TransportError> {
        let len = msg.payload.len();
        if len > buf.len() {
            let capacity = buf.len();
            self.deferred.push_front(msg);
            return Err(TransportError::MessageTooLarge { len, capacity });
        }
        buf[..len].copy_from_slice(&msg.payload);
        msg.delivered.store(true, Ordering::Release);
        Ok(Envelope {
            source: msg.source,
            len,
        })
    }

    fn take_deferred(&mut self, tag: Tag) -> Option<Message> {
        let idx = self.deferred.iter().position(|m| m.tag == tag)?;
        self.deferred.remove(idx)
    }
}

impl Transport for LocalTransport {
    type SendRequest = LocalSendRequest;

    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn isend(
        &mut self,
        dest: Rank,
        tag: Tag,
        bytes: &[u8],
    ) -> Result<LocalSendRequest, TransportError> {
        let size = self.size();
        let peer = self
            .peers
            .get(dest.index())
            .ok_or(TransportError::InvalidRank { rank: dest, size })?;
        let delivered = Arc::new(AtomicBool::new(false));
        peer.send(Message {
            source: self.rank,
            tag,
            payload: bytes.to_vec(),
            delivered: Arc::clone(&delivered),
        })
        .map_err(|_| TransportError::Disconnected { peer: dest.0 })?;
        Ok(LocalSendRequest { delivered })
    }

    fn try_recv(&mut self, tag: Tag, buf: &mut [u8]) -> Result<Option<Envelope>, TransportError> {
        if let Some(msg) = self.take_deferred(tag) {
            return self.deliver(msg, buf).map(Some);
        }
        loop {
            match self.inbox.try_recv() {
                Ok(msg) if msg.tag == tag => return self.deliver(msg, buf).map(Some),
                Ok(msg) => self.deferred.push_back(msg),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => {
                    return Err(TransportError::Disconnected { peer: self.rank.0 })
                }
            }
        }
    }

    fn recv_timeout(
        &mut self,
        tag: Tag,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<Envelope>, TransportError> {
        if let Some(msg) = self.take_deferred(tag) {
            return self.deliver(msg, buf).map(Some);
        }
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inbox.recv_timeout(remaining) {
                Ok(msg) if msg.tag == tag => return self.deliver(msg, buf).map(Some),
                Ok(msg) => self.deferred.push_back(msg),
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TransportError::Disconnected { peer: self.rank.0 })
                }
            }
        }
    }

    fn all_gather_bytes(&mut self, local: &[u8]) -> Result<Vec<Vec<u8>>, TransportError> {
        let poisoned = || TransportError::CollectiveFailed {
            reason: "collective state poisoned by a panicked rank".into(),
        };
        {
            let mut slots = self.hub.slots.lock().map_err(|_| poisoned())?;
            slots[self.rank.index()] = local.to_vec();
        }
        self.hub.barrier.wait();
        let gathered = self.hub.slots.lock().map_err(|_| poisoned())?.clone();
        self.hub.barrier.wait();
        tracing::trace!(rank = %self.rank, bytes = local.len(), "all_gather complete");
        Ok(gathered)
    }
}
