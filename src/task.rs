//! # Task Control Block
//!
//! Defines the task model: identity, priority, execution state, and the
//! wait bookkeeping that the primitives (mutex, event group, message queue)
//! record while a task is blocked.
//!
//! ## State machine
//!
//! ```text
//!   ┌─────────┐ start() ┌───────┐ dispatch ┌─────────┐
//!   │ Dormant │ ──────► │ Ready │ ◄──────► │ Running │
//!   └─────────┘         └───────┘ preempt  └─────────┘
//!                           ▲                 │    │
//!                      wake │    block        │    │ delete_self()
//!                           │                 ▼    ▼
//!                       ┌─────────┐      ┌────────────┐
//!                       │ Blocked │ ◄────┘ Terminated │
//!                       └─────────┘      └────────────┘
//! ```
//!
//! Blocking is pure data: a blocked task's `WaitReason` names the primitive
//! and resource it is parked on, and the completion of that wait is stored
//! as a `WaitResult` for the task to pick up when it next runs. There are
//! no coroutines and no per-task stacks — the scheduler is a state machine
//! driven by a single scheduling function.

use core::fmt;

use heapless::Vec;

use crate::config::MAX_MUTEXES;
use crate::event::{EventSet, GroupId, WaitMode};
use crate::mutex::MutexId;
use crate::queue::{Message, QueueId};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque task handle — an index into the kernel's task table.
///
/// Handles are minted only by `Kernel::create_task` and task slots are
/// never reused, so a handle can never dangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(pub(crate) usize);

/// 4-character ASCII object name, in the classic `('T','S','K','1')`
/// build-name style. Used for tasks, mutexes, event groups, and queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectName(pub [u8; 4]);

impl ObjectName {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() { b as char } else { '.' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Scheduling priority. Lower value = higher urgency (the demo convention:
/// a priority-10 server outranks a priority-20 worker). The derived `Ord`
/// therefore sorts the most urgent priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub u8);

impl Priority {
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    /// True when `self` outranks `other`.
    #[inline]
    pub fn is_more_urgent_than(self, other: Priority) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created but not yet started.
    Dormant,
    /// Eligible for execution, queued in the ready structure.
    Ready,
    /// Currently executing on the single logical CPU.
    Running,
    /// Waiting on a timed sleep or a primitive's wait list.
    Blocked,
    /// Final state; never rescheduled, slot never reused.
    Terminated,
}

// ---------------------------------------------------------------------------
// Wait bookkeeping
// ---------------------------------------------------------------------------

/// Why a blocked task is blocked, and on what. A task has at most one
/// wait reason at a time — it is never in two wait lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// Not waiting on anything.
    None,
    /// Timed sleep; the wake tick lives in `Tcb::wake_tick`.
    Sleep,
    /// Blocked on `obtain` of this mutex.
    Mutex(MutexId),
    /// Blocked on `event_receive`; the requested mask and combination
    /// mode travel with the waiter.
    Events {
        group: GroupId,
        mask: EventSet,
        mode: WaitMode,
    },
    /// Blocked on `queue_receive` of this queue.
    QueueReceive(QueueId),
    /// Blocked on `queue_send`; the outbound message is parked in
    /// `Tcb::pending_send` until space frees.
    QueueSend(QueueId),
}

/// Completion of a wait, recorded in the Tcb when the task is unblocked
/// and retrieved by the task (via `Kernel::take_wait_result`) once it
/// runs again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitResult {
    /// A blocked `obtain` succeeded; the task is now the holder.
    MutexAcquired,
    /// A blocked `event_receive` was satisfied with these bits.
    Events(EventSet),
    /// A blocked `queue_receive` was satisfied with this message.
    Message(Message),
    /// A blocked `queue_send` completed; the message is in the queue.
    Sent,
    /// The wait's bounded timeout expired before satisfaction.
    TimedOut,
}

/// How long a blocking operation is willing to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Block until satisfied, however long that takes.
    Forever,
    /// Do not block: fail immediately if unsatisfiable right now.
    NoWait,
    /// Block for at most this many ticks, then fail with `Timeout`.
    Ticks(u64),
}

impl Timeout {
    /// Absolute wake tick for a wait started at `now`, if bounded.
    /// `NoWait` never reaches the blocking path.
    pub(crate) fn deadline(self, now: u64) -> Option<u64> {
        match self {
            Timeout::Forever | Timeout::NoWait => None,
            Timeout::Ticks(n) => Some(now + n),
        }
    }
}

/// Immediate outcome of a blocking operation invoked by the running task.
///
/// `Pending` means the caller has been suspended; its `WaitResult` will be
/// available once the wait completes and the task runs again.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    /// The operation completed without blocking.
    Ready(T),
    /// The caller is now Blocked; the outcome arrives as a `WaitResult`.
    Pending,
}

impl<T> Completion<T> {
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Completion::Pending)
    }

    /// Unwrap an immediate completion. Panics on `Pending`; intended for
    /// call sites that have already arranged for the resource to be free.
    #[track_caller]
    pub fn expect_ready(self, msg: &str) -> T {
        match self {
            Completion::Ready(v) => v,
            Completion::Pending => panic!("{}", msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Per-task record owned exclusively by the kernel. No task mutates
/// another task's state directly — only through primitive operations.
#[derive(Debug)]
pub struct Tcb {
    /// 4-character name, for logs and diagnostics.
    pub(crate) name: ObjectName,
    /// Current execution state.
    pub(crate) state: TaskState,
    /// Static priority assigned at creation.
    pub(crate) base_priority: Priority,
    /// Current scheduling priority; equals `base_priority` unless raised
    /// by priority inheritance. Invariant: always the most urgent of the
    /// base priority and the head waiter of every held mutex.
    pub(crate) effective_priority: Priority,
    /// Absolute tick at which a timed wait expires.
    pub(crate) wake_tick: Option<u64>,
    /// What the task is blocked on, if anything.
    pub(crate) wait: WaitReason,
    /// Mutexes currently held — the priority obligations used to
    /// recompute `effective_priority` on each release.
    pub(crate) held: Vec<MutexId, MAX_MUTEXES>,
    /// FIFO tie-break stamp for the ready queue. Assigned when the task
    /// becomes Ready; preserved across preemption so a preempted task
    /// resumes ahead of equal-priority peers.
    pub(crate) ready_seq: u64,
    /// Completion of the most recent wait, not yet collected.
    pub(crate) wait_result: Option<WaitResult>,
    /// Outbound message of a blocked sender.
    pub(crate) pending_send: Option<Message>,
}

impl Tcb {
    pub(crate) fn new(name: ObjectName, priority: Priority) -> Self {
        Self {
            name,
            state: TaskState::Dormant,
            base_priority: priority,
            effective_priority: priority,
            wake_tick: None,
            wait: WaitReason::None,
            held: Vec::new(),
            ready_seq: 0,
            wait_result: None,
            pending_send: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
