//! Send-buffer pool.
//!
//! Each outgoing message is encoded into a pooled byte buffer that stays
//! pinned until the transport reports its send complete. Slots are
//! reclaimed only by polling [`Request::is_complete`]; a buffer is never
//! handed out again while its send is in flight. The pool grows on
//! demand and never shrinks during a run.

use std::fmt;

use filament_transport::Request;

/// Index of one pool slot. Valid only for the pool that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct SlotId(usize);

impl SlotId {
    /// Slot index within the pool.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

struct Slot<R> {
    buffer: Vec<u8>,
    in_flight: Option<R>,
    reserved: bool,
}

impl<R: Request> Slot<R> {
    fn is_free(&self) -> bool {
        !self.reserved && self.in_flight.is_none()
    }

    /// Drop the request if its send finished. Returns whether the slot is
    /// still busy.
    fn poll(&mut self) -> bool {
        if self.in_flight.as_ref().is_some_and(Request::is_complete) {
            self.in_flight = None;
        }
        self.in_flight.is_some()
    }
}

/// Arena of fixed-size send buffers keyed by their in-flight request.
pub struct SendPool<R> {
    slots: Vec<Slot<R>>,
    buffer_len: usize,
}

impl<R: Request> SendPool<R> {
    /// Create a pool with `initial` buffers of `buffer_len` bytes each.
    pub fn new(initial: usize, buffer_len: usize) -> Self {
        let mut pool = Self {
            slots: Vec::with_capacity(initial),
            buffer_len,
        };
        for _ in 0..initial {
            pool.grow();
        }
        pool
    }

    fn grow(&mut self) -> SlotId {
        self.slots.push(Slot {
            buffer: vec![0u8; self.buffer_len],
            in_flight: None,
            reserved: false,
        });
        SlotId(self.slots.len() - 1)
    }

    /// Reserve a free buffer, reclaiming completed sends first and
    /// allocating a new slot if every buffer is still in flight.
    pub fn acquire(&mut self) -> SlotId {
        let found = self
            .slots
            .iter_mut()
            .position(|s| !s.reserved && !s.poll());
        let id = match found {
            Some(i) => SlotId(i),
            None => self.grow(),
        };
        self.slots[id.0].reserved = true;
        id
    }

    /// Writable view of a reserved buffer.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not reserved.
    pub fn buffer_mut(&mut self, slot: SlotId) -> &mut [u8] {
        let s = &mut self.slots[slot.0];
        assert!(s.reserved, "{slot} written without being acquired");
        &mut s.buffer
    }

    /// Read-only view of a buffer.
    pub fn buffer(&self, slot: SlotId) -> &[u8] {
        &self.slots[slot.0].buffer
    }

    /// Pin `slot` until `request` completes.
    ///
    /// # Panics
    ///
    /// Panics if `slot` was not reserved by [`acquire`](Self::acquire).
    pub fn launch(&mut self, slot: SlotId, request: R) {
        let s = &mut self.slots[slot.0];
        assert!(s.reserved, "{slot} launched without being acquired");
        s.reserved = false;
        s.in_flight = Some(request);
    }

    /// Return a reserved slot unused, for instance after an encode error.
    pub fn release(&mut self, slot: SlotId) {
        self.slots[slot.0].reserved = false;
    }

    /// Poll every in-flight send and return how many are still pending.
    pub fn reclaim(&mut self) -> usize {
        self.slots.iter_mut().map(|s| s.poll()).filter(|&busy| busy).count()
    }

    /// Sends not yet known to be complete, without polling.
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| s.in_flight.is_some()).count()
    }

    /// Buffers that can be acquired without polling or growing.
    pub fn free(&self) -> usize {
        self.slots.iter().filter(|s| s.is_free()).count()
    }

    /// Number of buffers ever allocated.
    pub fn high_water(&self) -> usize {
        self.slots.len()
    }

    /// Size of every buffer in bytes.
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct Flag(Rc<Cell<bool>>);

    impl Flag {
        fn new() -> Self {
            Flag(Rc::new(Cell::new(false)))
        }
        fn complete(&self) {
            self.0.set(true);
        }
    }

    impl Request for Flag {
        fn is_complete(&self) -> bool {
            self.0.get()
        }
    }

    #[test]
    fn reuses_a_slot_only_after_completion() {
        let mut pool: SendPool<Flag> = SendPool::new(1, 16);
        let a = pool.acquire();
        let flag = Flag::new();
        pool.launch(a, flag.clone());

        let b = pool.acquire();
        assert_ne!(a, b, "in-flight slot must not be handed out");
        assert_eq!(pool.high_water(), 2);
        pool.release(b);

        flag.complete();
        let c = pool.acquire();
        assert_eq!(c, a);
        assert_eq!(pool.high_water(), 2);
    }

    #[test]
    fn reserved_slot_is_not_handed_out_twice() {
        let mut pool: SendPool<Flag> = SendPool::new(2, 8);
        let a = pool.acquire();
        let b = pool.acquire();
        assert_ne!(a, b);
        assert_eq!(pool.free(), 0);
    }

    #[test]
    fn reclaim_counts_pending_sends() {
        let mut pool: SendPool<Flag> = SendPool::new(0, 4);
        let flags: Vec<Flag> = (0..3).map(|_| Flag::new()).collect();
        for f in &flags {
            let slot = pool.acquire();
            pool.buffer_mut(slot)[0] = 7;
            pool.launch(slot, f.clone());
        }
        assert_eq!(pool.in_flight(), 3);
        assert_eq!(pool.reclaim(), 3);

        flags[1].complete();
        assert_eq!(pool.reclaim(), 2);
        assert_eq!(pool.in_flight(), 2);
        assert_eq!(pool.free(), 1);
        assert_eq!(pool.high_water(), 3);
    }

    #[test]
    fn buffers_have_the_configured_length() {
        let mut pool: SendPool<Flag> = SendPool::new(1, 32);
        let slot = pool.acquire();
        assert_eq!(pool.buffer_mut(slot).len(), 32);
        assert_eq!(pool.buffer(slot).len(), pool.buffer_len());
    }

    #[test]
    #[should_panic(expected = "launched without being acquired")]
    fn launching_an_unreserved_slot_panics() {
        let mut pool: SendPool<Flag> = SendPool::new(1, 4);
        let slot = pool.acquire();
        pool.release(slot);
        pool.launch(slot, Flag::new());
    }
}
