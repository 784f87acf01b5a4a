//! Per-rank task manager: routing, inbox, and termination detection.
//!
//! The [`TaskManager`] owns everything one rank knows about the protocol.
//! It keeps the pending queue, the set of tasks handed out to the tracer,
//! the send-buffer pool, the single reusable receive buffer, and (on the
//! leader) the global count of unfinished tasks.
//!
//! All state is mutated from the one thread that calls
//! [`next_task`](TaskManager::next_task) and
//! [`hand_back`](TaskManager::hand_back); nothing here is shared.
//!
//! # Termination
//!
//! The leader is the lowest rank with data. It alone knows how many tasks
//! exist. Every terminal task is reported to it once, as a local
//! decrement or a `TaskFinished` message. When its counter reaches zero it
//! sends `NoMoreTasks` to every other rank with data, exactly once, and
//! every rank returns `None` from `next_task` after draining its sends.

use std::collections::VecDeque;
use std::time::Duration;

use indexmap::IndexSet;
use tracing::{debug, info, trace};

use filament_core::{Rank, Tag, TailLayout, TaskId, TaskToken, TerminationReason};
use filament_locate::ProcessLocator;
use filament_transport::{Envelope, Transport};
use filament_wire::{decode_message, encode_message, message_capacity, ControlMessage};

use crate::config::{ConfigError, TracerConfig};
use crate::error::{ProtocolError, TracerError};
use crate::metrics::ManagerMetrics;
use crate::pool::SendPool;

// ── Public types ───────────────────────────────────────────────────

/// What the tracer decided after extending a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// The task can go on from its current seed: keep it if this rank
    /// owns the seed, otherwise migrate it to whichever rank does.
    Continue,
    /// The task is done.
    Finish(FinishCause),
}

/// Why a task reached a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishCause {
    /// The integrator stopped for a reason that ends the trace.
    Terminated(TerminationReason),
    /// The integrator produced no points at all.
    NoExtension,
    /// Exit probes kept landing inside the local partition.
    RetryLimit,
    /// No rank owns the task's next seed.
    NoOwner,
}

/// A task that reached a terminal state on this rank.
#[derive(Clone, Debug, PartialEq)]
pub struct FinishedTask {
    /// Final token state.
    pub token: TaskToken,
    /// Why it finished.
    pub cause: FinishCause,
}

/// Outcome of [`TaskManager::initialize`], identical on every rank
/// except for `local_tasks`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitSummary {
    /// Lowest rank with data, or `None` if no rank has any.
    pub leader: Option<Rank>,
    /// Seeds with a resolvable owner, across all ranks.
    pub total_tasks: u64,
    /// Seeds enqueued on this rank.
    pub local_tasks: usize,
}

/// Largest seed-ownership table `initialize` will reduce, in entries.
pub const MAX_SEED_TABLE: usize = 1 << 24;

/// Entries needed to index seed ids `0..=max_seed_id`.
fn seed_table_len(max_seed_id: u64) -> Result<usize, ProtocolError> {
    usize::try_from(max_seed_id)
        .ok()
        .and_then(|m| m.checked_add(1))
        .filter(|&len| len <= MAX_SEED_TABLE)
        .ok_or(ProtocolError::SeedTableTooLarge {
            max_seed_id,
            limit: MAX_SEED_TABLE,
        })
}

// ── Internal state ─────────────────────────────────────────────────

/// What this rank knows about global progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Remaining {
    /// Leader only: tasks not yet reported finished.
    Counting(u64),
    /// Non-leader waiting for `NoMoreTasks`.
    Unbounded,
    /// Termination observed, or no rank has data.
    Done,
}

/// Message loop and task bookkeeping for one rank.
pub struct TaskManager<T: Transport, L> {
    transport: T,
    locator: L,
    tag: Tag,
    layout: TailLayout,
    poll_interval: Duration,
    max_poll_interval: Duration,

    pool: SendPool<T::SendRequest>,
    recv_buf: Vec<u8>,

    pending: VecDeque<TaskToken>,
    /// Tasks currently handed out to the caller.
    active: IndexSet<TaskId>,
    /// Every task held by this rank: pending, active, or awaiting routing.
    held: IndexSet<TaskId>,
    outgoing: Vec<(TaskToken, Disposition)>,

    initialized: bool,
    has_local_data: bool,
    ranks_with_data: Vec<Rank>,
    leader: Option<Rank>,
    total_tasks: u64,
    remaining: Remaining,
    broadcast_sent: bool,

    finished: Vec<FinishedTask>,
    metrics: ManagerMetrics,
}

impl<T: Transport, L: ProcessLocator> TaskManager<T, L> {
    /// Validate `config` and create an uninitialized manager.
    pub fn new(transport: T, locator: L, config: &TracerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = message_capacity(&config.tail_layout);
        Ok(Self {
            transport,
            locator,
            tag: config.tag,
            layout: config.tail_layout.clone(),
            poll_interval: config.poll_interval,
            max_poll_interval: config.max_poll_interval,
            pool: SendPool::new(config.initial_send_buffers, capacity),
            recv_buf: vec![0u8; capacity],
            pending: VecDeque::new(),
            active: IndexSet::new(),
            held: IndexSet::new(),
            outgoing: Vec::new(),
            initialized: false,
            has_local_data: false,
            ranks_with_data: Vec::new(),
            leader: None,
            total_tasks: 0,
            remaining: Remaining::Done,
            broadcast_sent: false,
            finished: Vec::new(),
            metrics: ManagerMetrics::default(),
        })
    }

    /// Elect the leader, count the tasks, and enqueue locally owned
    /// seeds. Collective: every rank must call it with the same
    /// `max_seed_id`.
    ///
    /// A seed is owned by the highest rank that has data and whose
    /// partition contains it. Seeds no rank owns are dropped and do not
    /// count towards the total.
    pub fn initialize(
        &mut self,
        has_local_data: bool,
        seeds: Vec<TaskToken>,
        max_seed_id: u64,
    ) -> Result<InitSummary, TracerError> {
        if self.initialized {
            return Err(ProtocolError::AlreadyInitialized.into());
        }
        if let Some(bad) = seeds.iter().find(|s| s.id().0 > max_seed_id) {
            return Err(ProtocolError::SeedIdOutOfRange {
                task: bad.id(),
                max_seed_id,
            }
            .into());
        }
        let table_len = seed_table_len(max_seed_id)?;
        let rank = self.transport.rank();

        let flags = self.transport.all_gather_bytes(&[u8::from(has_local_data)])?;
        self.ranks_with_data = flags
            .iter()
            .enumerate()
            .filter(|(_, f)| f.first() == Some(&1))
            .map(|(r, _)| Rank(r as u32))
            .collect();
        self.leader = self.ranks_with_data.first().copied();
        self.has_local_data = has_local_data;

        let mut owners = vec![-1i32; table_len];
        if has_local_data {
            for seed in &seeds {
                if self.locator.owns(&seed.seed) {
                    owners[seed.id().index()] = rank.0 as i32;
                }
            }
        }
        self.transport.all_reduce_max_i32(&mut owners)?;
        self.total_tasks = owners.iter().filter(|&&o| o >= 0).count() as u64;

        for mut seed in seeds {
            if owners[seed.id().index()] != rank.0 as i32 || !self.held.insert(seed.id()) {
                continue;
            }
            seed.owner_hint = Some(rank);
            self.locator.annotate(&mut seed);
            self.pending.push_back(seed);
        }
        self.metrics.seeded = self.pending.len() as u64;

        self.remaining = match self.leader {
            None => Remaining::Done,
            Some(leader) if leader == rank => Remaining::Counting(self.total_tasks),
            Some(_) => Remaining::Unbounded,
        };
        self.initialized = true;

        info!(
            rank = %rank,
            leader = ?self.leader.map(|r| r.0),
            total = self.total_tasks,
            local = self.pending.len(),
            "task manager initialized"
        );
        Ok(InitSummary {
            leader: self.leader,
            total_tasks: self.total_tasks,
            local_tasks: self.pending.len(),
        })
    }

    /// The next task to extend, or `None` once the whole computation has
    /// finished.
    ///
    /// Routes every task handed back since the last call, applies every
    /// message already received, and blocks with backoff only when this
    /// rank has nothing pending and global termination has not been
    /// observed. Tasks handed out earlier must be handed back before
    /// calling again, or the call can block forever.
    pub fn next_task(&mut self) -> Result<Option<TaskToken>, TracerError> {
        if !self.initialized {
            return Err(ProtocolError::NotInitialized.into());
        }
        if !self.has_local_data {
            return Ok(None);
        }

        let mut wait = self.poll_interval;
        loop {
            self.flush_outgoing()?;
            self.poll_inbox()?;

            if let Some(task) = self.pending.pop_front() {
                self.active.insert(task.id());
                self.metrics.tasks_started += 1;
                trace!(rank = %self.rank(), task = %task.id(), "task started");
                return Ok(Some(task));
            }

            if self.globally_done() {
                self.broadcast_no_more_tasks()?;
                self.drain_sends();
                info!(
                    rank = %self.rank(),
                    finished = self.metrics.finished_local,
                    "no more tasks"
                );
                return Ok(None);
            }

            self.metrics.blocking_waits += 1;
            self.pool.reclaim();
            match self
                .transport
                .recv_timeout(self.tag, &mut self.recv_buf, wait)?
            {
                Some(envelope) => {
                    self.handle_envelope(envelope)?;
                    wait = self.poll_interval;
                }
                None => wait = (wait * 2).min(self.max_poll_interval),
            }
        }
    }

    /// Return a task obtained from [`next_task`](Self::next_task). It is
    /// routed on the next `next_task` call.
    pub fn hand_back(
        &mut self,
        task: TaskToken,
        disposition: Disposition,
    ) -> Result<(), ProtocolError> {
        if !self.initialized {
            return Err(ProtocolError::NotInitialized);
        }
        if !self.active.swap_remove(&task.id()) {
            return Err(ProtocolError::UnexpectedHandBack { task: task.id() });
        }
        self.outgoing.push((task, disposition));
        Ok(())
    }

    // ── Routing ────────────────────────────────────────────────────

    fn flush_outgoing(&mut self) -> Result<(), TracerError> {
        for (task, disposition) in std::mem::take(&mut self.outgoing) {
            self.route(task, disposition)?;
        }
        Ok(())
    }

    fn route(&mut self, mut task: TaskToken, disposition: Disposition) -> Result<(), TracerError> {
        match disposition {
            Disposition::Finish(cause) => self.finish(task, cause),
            Disposition::Continue if self.locator.owns(&task.seed) => {
                task.owner_hint = Some(self.rank());
                self.locator.annotate(&mut task);
                self.pending.push_back(task);
                Ok(())
            }
            Disposition::Continue => match self.locator.find_owner(&task.seed) {
                Some(dest) => self.migrate(task, dest),
                None => self.finish(task, FinishCause::NoOwner),
            },
        }
    }

    fn migrate(&mut self, mut task: TaskToken, dest: Rank) -> Result<(), TracerError> {
        let id = task.id();
        self.held.swap_remove(&id);
        task.record_hop(dest);
        self.locator.annotate(&mut task);
        debug!(
            rank = %self.rank(),
            task = %id,
            dest = %dest,
            hops = task.num_hops(),
            steps = task.step_count(),
            "migrating task"
        );
        self.send(dest, &ControlMessage::NewTask(task))?;
        self.metrics.tasks_sent += 1;
        Ok(())
    }

    fn finish(&mut self, task: TaskToken, cause: FinishCause) -> Result<(), TracerError> {
        let id = task.id();
        let rank = self.rank();
        self.held.swap_remove(&id);
        self.metrics.finished_local += 1;
        debug!(rank = %rank, task = %id, cause = ?cause, steps = task.step_count(), "task finished");
        self.finished.push(FinishedTask { token: task, cause });

        match self.leader {
            Some(leader) if leader == rank => self.count_finished(id)?,
            Some(leader) => {
                self.send(leader, &ControlMessage::TaskFinished(id))?;
                self.metrics.finish_reports_sent += 1;
            }
            None => return Err(ProtocolError::NotInitialized.into()),
        }
        Ok(())
    }

    /// Leader-side decrement of the global counter.
    fn count_finished(&mut self, task: TaskId) -> Result<(), ProtocolError> {
        match self.remaining {
            Remaining::Counting(0) => Err(ProtocolError::CounterUnderflow { task }),
            Remaining::Counting(n) => {
                self.remaining = Remaining::Counting(n - 1);
                if n == 1 {
                    info!(rank = %self.rank(), total = self.total_tasks, "all tasks finished");
                }
                Ok(())
            }
            Remaining::Unbounded | Remaining::Done => Err(ProtocolError::TaskFinishedAtNonLeader {
                task,
                from: self.rank(),
            }),
        }
    }

    fn broadcast_no_more_tasks(&mut self) -> Result<(), TracerError> {
        if !self.is_leader() || self.broadcast_sent {
            return Ok(());
        }
        let rank = self.rank();
        let peers: Vec<Rank> = self
            .ranks_with_data
            .iter()
            .copied()
            .filter(|&r| r != rank)
            .collect();
        for peer in peers {
            self.send(peer, &ControlMessage::NoMoreTasks)?;
            self.metrics.no_more_tasks_sent += 1;
            debug!(rank = %rank, dest = %peer, "sent NoMoreTasks");
        }
        self.broadcast_sent = true;
        Ok(())
    }

    fn globally_done(&self) -> bool {
        matches!(self.remaining, Remaining::Counting(0) | Remaining::Done)
    }

    // ── Transport ──────────────────────────────────────────────────

    fn send(&mut self, dest: Rank, msg: &ControlMessage) -> Result<(), TracerError> {
        let rank = self.transport.rank();
        let slot = self.pool.acquire();
        let len = match encode_message(self.pool.buffer_mut(slot), rank, msg, &self.layout) {
            Ok(len) => len,
            Err(e) => {
                self.pool.release(slot);
                return Err(e.into());
            }
        };
        let request = match self
            .transport
            .isend(dest, self.tag, &self.pool.buffer(slot)[..len])
        {
            Ok(request) => request,
            Err(e) => {
                self.pool.release(slot);
                return Err(e.into());
            }
        };
        self.pool.launch(slot, request);
        self.metrics.send_pool_high_water =
            self.metrics.send_pool_high_water.max(self.pool.high_water());
        Ok(())
    }

    fn poll_inbox(&mut self) -> Result<(), TracerError> {
        while let Some(envelope) = self.transport.try_recv(self.tag, &mut self.recv_buf)? {
            self.handle_envelope(envelope)?;
        }
        Ok(())
    }

    fn handle_envelope(&mut self, envelope: Envelope) -> Result<(), TracerError> {
        let (sender, msg) = decode_message(&self.recv_buf[..envelope.len], &self.layout)?;
        trace!(
            rank = %self.rank(),
            from = %sender,
            kind = ?msg.message_type(),
            "received message"
        );
        self.apply(sender, msg)?;
        Ok(())
    }

    fn apply(&mut self, sender: Rank, msg: ControlMessage) -> Result<(), ProtocolError> {
        let rank = self.rank();
        match msg {
            ControlMessage::NewTask(mut task) => {
                let id = task.id();
                if self.globally_done() {
                    return Err(ProtocolError::NewTaskAfterNoMoreTasks { task: id, from: sender });
                }
                if !self.held.insert(id) {
                    return Err(ProtocolError::DuplicateTask { task: id });
                }
                task.owner_hint = Some(rank);
                debug!(rank = %rank, task = %id, from = %sender, hops = task.num_hops(), "task arrived");
                self.pending.push_back(task);
                self.metrics.tasks_received += 1;
            }
            ControlMessage::TaskFinished(id) => {
                if !self.is_leader() {
                    return Err(ProtocolError::TaskFinishedAtNonLeader { task: id, from: sender });
                }
                self.metrics.finish_reports_received += 1;
                debug!(rank = %rank, task = %id, from = %sender, "finish report");
                self.count_finished(id)?;
            }
            ControlMessage::NoMoreTasks => {
                if self.is_leader() {
                    return Err(ProtocolError::NoMoreTasksAtLeader { from: sender });
                }
                let outstanding = self.held.len();
                if outstanding > 0 {
                    return Err(ProtocolError::NoMoreTasksWithWork { outstanding });
                }
                self.metrics.no_more_tasks_received += 1;
                debug!(rank = %rank, from = %sender, "received NoMoreTasks");
                self.remaining = Remaining::Done;
            }
        }
        Ok(())
    }

    /// Wait until every pooled send has been matched by its receiver.
    fn drain_sends(&mut self) {
        let mut wait = self.poll_interval;
        loop {
            let in_flight = self.pool.reclaim();
            if in_flight == 0 {
                return;
            }
            trace!(rank = %self.rank(), in_flight, "draining sends");
            std::thread::sleep(wait);
            wait = (wait * 2).min(self.max_poll_interval);
        }
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// This rank.
    pub fn rank(&self) -> Rank {
        self.transport.rank()
    }

    /// The elected leader, once initialized.
    pub fn leader(&self) -> Option<Rank> {
        self.leader
    }

    /// Whether this rank is the leader.
    pub fn is_leader(&self) -> bool {
        self.leader == Some(self.rank())
    }

    /// Whether this rank holds any data.
    pub fn has_local_data(&self) -> bool {
        self.has_local_data
    }

    /// Global task count from initialization.
    pub fn total_tasks(&self) -> u64 {
        self.total_tasks
    }

    /// Tasks waiting to be handed out.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The ownership locator.
    pub fn locator(&self) -> &L {
        &self.locator
    }

    /// The attribute layout of every tail.
    pub fn layout(&self) -> &TailLayout {
        &self.layout
    }

    /// Counters collected so far.
    pub fn metrics(&self) -> &ManagerMetrics {
        &self.metrics
    }

    /// Tasks that finished on this rank since the last call.
    pub fn take_finished(&mut self) -> Vec<FinishedTask> {
        std::mem::take(&mut self.finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filament_core::{BoundingBox, Direction, Point3};
    use filament_locate::BoundingBoxLocator;
    use filament_transport::LocalTransport;
    use std::thread;

    fn slab(x0: f64, x1: f64) -> Option<BoundingBox> {
        BoundingBox::new(Point3::new(x0, 0.0, 0.0), Point3::new(x1, 1.0, 1.0))
    }

    fn token(id: u64, x: f64) -> TaskToken {
        TaskToken::new(TaskId(id), Point3::new(x, 0.5, 0.5), Direction::Forward)
    }

    fn solo(boxes: Vec<Option<BoundingBox>>) -> TaskManager<LocalTransport, BoundingBoxLocator> {
        let transport = LocalTransport::group(1).remove(0);
        let locator = BoundingBoxLocator::from_table(Rank(0), boxes);
        TaskManager::new(transport, locator, &TracerConfig::default()).unwrap()
    }

    #[test]
    fn next_task_before_initialize_is_an_error() {
        let mut mgr = solo(vec![slab(0.0, 1.0)]);
        assert!(matches!(
            mgr.next_task(),
            Err(TracerError::Protocol(ProtocolError::NotInitialized))
        ));
    }

    #[test]
    fn initialize_twice_is_an_error() {
        let mut mgr = solo(vec![slab(0.0, 1.0)]);
        mgr.initialize(true, vec![], 0).unwrap();
        assert!(matches!(
            mgr.initialize(true, vec![], 0),
            Err(TracerError::Protocol(ProtocolError::AlreadyInitialized))
        ));
    }

    #[test]
    fn seed_id_above_max_is_rejected() {
        let mut mgr = solo(vec![slab(0.0, 1.0)]);
        let err = mgr.initialize(true, vec![token(5, 0.5)], 2).unwrap_err();
        assert!(matches!(
            err,
            TracerError::Protocol(ProtocolError::SeedIdOutOfRange { .. })
        ));
    }

    #[test]
    fn oversized_seed_table_is_rejected() {
        for max_seed_id in [u64::MAX, 1 << 40, MAX_SEED_TABLE as u64] {
            let mut mgr = solo(vec![slab(0.0, 1.0)]);
            let err = mgr.initialize(true, vec![token(0, 0.5)], max_seed_id).unwrap_err();
            assert!(matches!(
                err,
                TracerError::Protocol(ProtocolError::SeedTableTooLarge { limit: MAX_SEED_TABLE, .. })
            ));
            // Nothing was exchanged, so the manager can still be set up.
            mgr.initialize(true, vec![token(0, 0.5)], 0).unwrap();
        }
    }

    #[test]
    fn largest_seed_table_fits() {
        assert_eq!(seed_table_len(MAX_SEED_TABLE as u64 - 1), Ok(MAX_SEED_TABLE));
    }

    #[test]
    fn zero_poll_interval_is_rejected_at_construction() {
        let transport = LocalTransport::group(1).remove(0);
        let locator = BoundingBoxLocator::from_table(Rank(0), vec![slab(0.0, 1.0)]);
        let config = TracerConfig {
            poll_interval: Duration::ZERO,
            ..TracerConfig::default()
        };
        assert!(matches!(
            TaskManager::new(transport, locator, &config),
            Err(ConfigError::InvalidPollInterval { .. })
        ));
    }

    #[test]
    fn single_rank_hands_out_each_seed_once() {
        let mut mgr = solo(vec![slab(0.0, 1.0)]);
        let seeds = vec![token(0, 0.1), token(1, 0.5), token(2, 0.9)];
        let summary = mgr.initialize(true, seeds, 2).unwrap();
        assert_eq!(summary.leader, Some(Rank(0)));
        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.local_tasks, 3);

        let mut calls = 0;
        while let Some(task) = mgr.next_task().unwrap() {
            calls += 1;
            assert_eq!(task.owner_hint, Some(Rank(0)));
            mgr.hand_back(
                task,
                Disposition::Finish(FinishCause::Terminated(TerminationReason::OutOfDomain)),
            )
            .unwrap();
        }
        assert_eq!(calls, 3);
        assert_eq!(mgr.take_finished().len(), 3);
        assert_eq!(mgr.metrics().finished_local, 3);
        assert_eq!(mgr.metrics().no_more_tasks_sent, 0);
        // Stays terminated.
        assert!(mgr.next_task().unwrap().is_none());
    }

    #[test]
    fn unowned_seed_is_not_counted() {
        let mut mgr = solo(vec![slab(0.0, 1.0)]);
        let seeds = vec![token(0, 0.5), token(1, 5.0)];
        let summary = mgr.initialize(true, seeds, 1).unwrap();
        assert_eq!(summary.total_tasks, 1);
        assert_eq!(mgr.pending_len(), 1);
        let task = mgr.next_task().unwrap().unwrap();
        assert_eq!(task.id(), TaskId(0));
    }

    #[test]
    fn duplicate_seed_ids_are_enqueued_once() {
        let mut mgr = solo(vec![slab(0.0, 1.0)]);
        let summary = mgr
            .initialize(true, vec![token(0, 0.2), token(0, 0.3)], 0)
            .unwrap();
        assert_eq!(summary.total_tasks, 1);
        assert_eq!(summary.local_tasks, 1);
    }

    #[test]
    fn rank_without_data_gets_nothing() {
        let mut mgr = solo(vec![None]);
        let summary = mgr.initialize(false, vec![token(0, 0.5)], 0).unwrap();
        assert_eq!(summary.leader, None);
        assert_eq!(summary.total_tasks, 0);
        assert!(mgr.next_task().unwrap().is_none());
    }

    #[test]
    fn continue_inside_partition_requeues_locally() {
        let mut mgr = solo(vec![slab(0.0, 1.0)]);
        mgr.initialize(true, vec![token(0, 0.2)], 0).unwrap();

        let mut task = mgr.next_task().unwrap().unwrap();
        task.seed = Point3::new(0.6, 0.5, 0.5);
        mgr.hand_back(task, Disposition::Continue).unwrap();

        let again = mgr.next_task().unwrap().unwrap();
        assert_eq!(again.id(), TaskId(0));
        assert_eq!(again.seed, Point3::new(0.6, 0.5, 0.5));
        assert_eq!(again.num_hops(), 0);
        assert_eq!(mgr.metrics().tasks_started, 2);
    }

    #[test]
    fn continue_without_owner_finishes_the_task() {
        let mut mgr = solo(vec![slab(0.0, 1.0)]);
        mgr.initialize(true, vec![token(0, 0.2)], 0).unwrap();

        let mut task = mgr.next_task().unwrap().unwrap();
        task.seed = Point3::new(3.0, 0.5, 0.5);
        mgr.hand_back(task, Disposition::Continue).unwrap();

        assert!(mgr.next_task().unwrap().is_none());
        let finished = mgr.take_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].cause, FinishCause::NoOwner);
    }

    #[test]
    fn hand_back_of_unknown_task_is_rejected() {
        let mut mgr = solo(vec![slab(0.0, 1.0)]);
        mgr.initialize(true, vec![token(0, 0.2)], 0).unwrap();
        let err = mgr
            .hand_back(token(9, 0.2), Disposition::Continue)
            .unwrap_err();
        assert_eq!(err, ProtocolError::UnexpectedHandBack { task: TaskId(9) });
    }

    /// Drive a peer rank by hand: join the two collectives of
    /// `initialize`, then send raw control messages to `dest` in order.
    fn fake_peer(
        mut t: LocalTransport,
        has_data: bool,
        slots: usize,
        dest: Rank,
        msgs: &[ControlMessage],
    ) {
        t.all_gather_bytes(&[u8::from(has_data)]).unwrap();
        let mut owners = vec![-1i32; slots];
        t.all_reduce_max_i32(&mut owners).unwrap();
        let mut buf = vec![0u8; message_capacity(&TailLayout::empty())];
        for msg in msgs {
            let len = encode_message(&mut buf, t.rank(), msg, &TailLayout::empty()).unwrap();
            t.isend(dest, Tag::STREAM_TRACE, &buf[..len]).unwrap();
        }
    }

    /// Split a two-rank group into (rank 0, rank 1).
    fn pair() -> (LocalTransport, LocalTransport) {
        let mut group = LocalTransport::group(2);
        let t1 = group.pop().unwrap();
        let t0 = group.pop().unwrap();
        (t0, t1)
    }

    #[test]
    fn finish_report_at_non_leader_is_a_protocol_error() {
        let (t0, t1) = pair();
        let peer = thread::spawn(move || {
            fake_peer(t0, true, 1, Rank(1), &[ControlMessage::TaskFinished(TaskId(0))]);
        });

        let locator = BoundingBoxLocator::from_table(Rank(1), vec![slab(0.0, 1.0), slab(1.0, 2.0)]);
        let mut mgr = TaskManager::new(t1, locator, &TracerConfig::default()).unwrap();
        let summary = mgr.initialize(true, vec![], 0).unwrap();
        assert_eq!(summary.leader, Some(Rank(0)));
        peer.join().unwrap();

        assert!(matches!(
            mgr.next_task(),
            Err(TracerError::Protocol(ProtocolError::TaskFinishedAtNonLeader { .. }))
        ));
    }

    #[test]
    fn no_more_tasks_at_leader_is_a_protocol_error() {
        let (t0, t1) = pair();
        // Rank 0 has no data, so rank 1 leads.
        let peer = thread::spawn(move || fake_peer(t0, false, 1, Rank(1), &[ControlMessage::NoMoreTasks]));

        let locator = BoundingBoxLocator::from_table(Rank(1), vec![None, slab(1.0, 2.0)]);
        let mut mgr = TaskManager::new(t1, locator, &TracerConfig::default()).unwrap();
        let summary = mgr.initialize(true, vec![], 0).unwrap();
        assert_eq!(summary.leader, Some(Rank(1)));
        peer.join().unwrap();

        assert!(matches!(
            mgr.next_task(),
            Err(TracerError::Protocol(ProtocolError::NoMoreTasksAtLeader { .. }))
        ));
    }

    #[test]
    fn duplicate_arrival_is_a_protocol_error() {
        let (t0, t1) = pair();
        let peer = thread::spawn(move || {
            fake_peer(t0, true, 1, Rank(1), &[ControlMessage::NewTask(token(0, 1.5))]);
        });

        let locator = BoundingBoxLocator::from_table(Rank(1), vec![slab(0.0, 1.0), slab(1.0, 2.0)]);
        let mut mgr = TaskManager::new(t1, locator, &TracerConfig::default()).unwrap();
        // Rank 1 already owns seed 0 locally.
        mgr.initialize(true, vec![token(0, 1.5)], 0).unwrap();
        peer.join().unwrap();

        assert!(matches!(
            mgr.next_task(),
            Err(TracerError::Protocol(ProtocolError::DuplicateTask { .. }))
        ));
    }

    #[test]
    fn finish_report_with_counter_at_zero_underflows() {
        let (t0, t1) = pair();
        // Rank 1 has no data; rank 0 leads with nothing to count.
        let peer = thread::spawn(move || {
            fake_peer(t1, false, 1, Rank(0), &[ControlMessage::TaskFinished(TaskId(0))]);
        });

        let locator = BoundingBoxLocator::from_table(Rank(0), vec![slab(0.0, 1.0), None]);
        let mut mgr = TaskManager::new(t0, locator, &TracerConfig::default()).unwrap();
        let summary = mgr.initialize(true, vec![], 0).unwrap();
        assert_eq!(summary.leader, Some(Rank(0)));
        assert_eq!(summary.total_tasks, 0);
        peer.join().unwrap();

        assert!(matches!(
            mgr.next_task(),
            Err(TracerError::Protocol(ProtocolError::CounterUnderflow { task: TaskId(0) }))
        ));
    }

    #[test]
    fn new_task_after_no_more_tasks_is_a_protocol_error() {
        let (t0, t1) = pair();
        let peer = thread::spawn(move || {
            fake_peer(
                t0,
                true,
                1,
                Rank(1),
                &[ControlMessage::NoMoreTasks, ControlMessage::NewTask(token(0, 1.5))],
            );
        });

        let locator = BoundingBoxLocator::from_table(Rank(1), vec![slab(0.0, 1.0), slab(1.0, 2.0)]);
        let mut mgr = TaskManager::new(t1, locator, &TracerConfig::default()).unwrap();
        mgr.initialize(true, vec![], 0).unwrap();
        peer.join().unwrap();

        assert!(matches!(
            mgr.next_task(),
            Err(TracerError::Protocol(ProtocolError::NewTaskAfterNoMoreTasks {
                task: TaskId(0),
                from: Rank(0),
            }))
        ));
    }

    #[test]
    fn no_more_tasks_while_holding_work_is_a_protocol_error() {
        let (t0, t1) = pair();
        let peer = thread::spawn(move || {
            fake_peer(t0, true, 1, Rank(1), &[ControlMessage::NoMoreTasks]);
        });

        let locator = BoundingBoxLocator::from_table(Rank(1), vec![slab(0.0, 1.0), slab(1.0, 2.0)]);
        let mut mgr = TaskManager::new(t1, locator, &TracerConfig::default()).unwrap();
        let summary = mgr.initialize(true, vec![token(0, 1.5)], 0).unwrap();
        assert_eq!(summary.local_tasks, 1);
        peer.join().unwrap();

        assert!(matches!(
            mgr.next_task(),
            Err(TracerError::Protocol(ProtocolError::NoMoreTasksWithWork { outstanding: 1 }))
        ));
        assert_eq!(mgr.pending_len(), 1);
    }
}
