//! Per-rank protocol counters.
//!
//! [`ManagerMetrics`] is cumulative over one run and is returned in the
//! [`RunReport`](crate::RunReport). The conservation and termination
//! properties of the protocol are checked against these counters.

/// Message and task counters collected by one [`TaskManager`](crate::TaskManager).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManagerMetrics {
    /// Tasks enqueued from the initial seed list.
    pub seeded: u64,
    /// `NewTask` messages received.
    pub tasks_received: u64,
    /// `NewTask` messages sent.
    pub tasks_sent: u64,
    /// Tasks handed out by `next_task`, counting re-entries after migration.
    pub tasks_started: u64,
    /// Tasks that reached a terminal state on this rank.
    pub finished_local: u64,
    /// `TaskFinished` messages sent to the leader.
    pub finish_reports_sent: u64,
    /// `TaskFinished` messages received (leader only).
    pub finish_reports_received: u64,
    /// `NoMoreTasks` messages sent (leader only).
    pub no_more_tasks_sent: u64,
    /// `NoMoreTasks` messages received (non-leaders only).
    pub no_more_tasks_received: u64,
    /// Idle waits while work was outstanding elsewhere.
    pub blocking_waits: u64,
    /// Largest number of send buffers allocated at once.
    pub send_pool_high_water: usize,
}
