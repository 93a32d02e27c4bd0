//! # Kernel Core
//!
//! The scheduler and task lifecycle operations. `Kernel` is an explicitly
//! passed context object owning the task table, the ready queue, the clock,
//! and the arenas for every primitive — there are no globals and no interior
//! mutability; exclusivity comes from `&mut self`.
//!
//! ## Scheduling model
//!
//! Single logical CPU, fully preemptive, no time-slicing. Every operation
//! that can change the ready set ends with one call to [`Kernel::schedule`],
//! the single point where the Running task is chosen:
//!
//! 1. If nothing is running, dispatch the head of the ready queue.
//! 2. If the head of the ready queue is *strictly* more urgent than the
//!    running task, preempt. The preempted task re-enters the ready queue
//!    with its original arrival stamp, so it stays ahead of equal-priority
//!    peers and resumes exactly where it left off in the ordering.
//! 3. Ties never switch — among equal priorities, arrival order rules and
//!    a task runs until its next blocking point or voluntary yield.
//!
//! Blocking operations live in the primitive modules (`mutex`, `event`,
//! `queue`) as further `impl Kernel` blocks; they share the internal
//! helpers defined here.

use log::{debug, trace};

use heapless::Vec;

use crate::clock::Clock;
use crate::config::{MAX_EVENT_GROUPS, MAX_MUTEXES, MAX_QUEUES, MAX_TASKS};
use crate::error::{KernelError, KernelResult};
use crate::event::EventGroup;
use crate::mutex::Mutex;
use crate::queue::MessageQueue;
use crate::schedq::SchedQueue;
use crate::task::{ObjectName, Priority, TaskId, TaskState, Tcb, WaitReason, WaitResult};

/// The kernel context. Owns every record; handles are indices into the
/// arenas below, minted only by the `create_*` operations.
#[derive(Debug)]
pub struct Kernel {
    pub(crate) clock: Clock,
    pub(crate) tasks: Vec<Tcb, MAX_TASKS>,
    pub(crate) running: Option<TaskId>,
    pub(crate) ready: SchedQueue,
    pub(crate) mutexes: Vec<Mutex, MAX_MUTEXES>,
    pub(crate) groups: Vec<EventGroup, MAX_EVENT_GROUPS>,
    pub(crate) queues: Vec<MessageQueue, MAX_QUEUES>,
    /// Arrival stamp source for FIFO tie-breaks, shared by the ready
    /// queue and every wait list.
    seq: u64,
}

impl Kernel {
    pub fn new() -> Self {
        Self {
            clock: Clock::new(),
            tasks: Vec::new(),
            running: None,
            ready: SchedQueue::new(),
            mutexes: Vec::new(),
            groups: Vec::new(),
            queues: Vec::new(),
            seq: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Task lifecycle
    // -----------------------------------------------------------------------

    /// Allocate a task in the Dormant state.
    ///
    /// Fails with `ResourceExhausted` when the task table is full — at
    /// system-initialization time the external initializer must treat
    /// that as a startup abort.
    pub fn create_task(&mut self, name: ObjectName, priority: Priority) -> KernelResult<TaskId> {
        let id = TaskId(self.tasks.len());
        self.tasks
            .push(Tcb::new(name, priority))
            .map_err(|_| KernelError::ResourceExhausted)?;
        debug!("task {} created at priority {}", name, priority);
        Ok(id)
    }

    /// Transition a Dormant task to Ready. The task does not run yet,
    /// but the scheduling pass that follows may preempt the current task
    /// if the new one outranks it.
    pub fn start_task(&mut self, id: TaskId) -> KernelResult<()> {
        if self.tasks[id.0].state != TaskState::Dormant {
            return Err(KernelError::InvalidArgument);
        }
        trace!("task {} started", self.tasks[id.0].name);
        self.make_ready(id, None);
        self.schedule();
        Ok(())
    }

    /// Voluntary yield. The caller keeps its arrival stamp, so among
    /// equal-priority peers it is still first in line: control only
    /// transfers if a strictly more urgent task is Ready.
    pub fn yield_now(&mut self) -> KernelResult<()> {
        let cur = self.running_or_err()?;
        let tcb = &mut self.tasks[cur.0];
        tcb.state = TaskState::Ready;
        let (prio, seq) = (tcb.effective_priority, tcb.ready_seq);
        self.ready.insert(cur, prio, seq);
        self.running = None;
        self.schedule();
        Ok(())
    }

    /// Block the running task until `clock >= tick`. The task is
    /// guaranteed not to become Ready before that tick, and becomes Ready
    /// (not necessarily Running) as soon as it elapses. A tick already in
    /// the past degenerates to a yield.
    pub fn sleep_until(&mut self, tick: u64) -> KernelResult<()> {
        let cur = self.running_or_err()?;
        if tick <= self.clock.now() {
            return self.yield_now();
        }
        trace!("task {} sleeps until tick {}", self.tasks[cur.0].name, tick);
        self.block_running(cur, WaitReason::Sleep, Some(tick));
        self.schedule();
        Ok(())
    }

    /// Relative form of [`sleep_until`](Self::sleep_until) — the only form
    /// the demo tasks use. `wake_after(0)` is a yield.
    pub fn wake_after(&mut self, ticks: u64) -> KernelResult<()> {
        let deadline = self.clock.now() + ticks;
        self.sleep_until(deadline)
    }

    /// Terminate the running task. Every mutex it still holds is released
    /// first (with full priority-inheritance bookkeeping, waking waiters),
    /// then the slot is retired for good.
    pub fn delete_self(&mut self) -> KernelResult<()> {
        let cur = self.running_or_err()?;
        while let Some(&mutex) = self.tasks[cur.0].held.last() {
            self.release_owned(cur, mutex);
        }
        debug!("task {} terminated", self.tasks[cur.0].name);
        let tcb = &mut self.tasks[cur.0];
        tcb.state = TaskState::Terminated;
        tcb.wait = WaitReason::None;
        tcb.wake_tick = None;
        tcb.wait_result = None;
        self.running = None;
        self.schedule();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Clock driver entry point
    // -----------------------------------------------------------------------

    /// Advance the logical clock one tick. Every tick-expired wait is
    /// resolved: sleepers become Ready, timed-out primitive waits are
    /// removed from their wait list and handed `WaitResult::TimedOut`
    /// (a timed-out mutex waiter also re-derives the holder's inherited
    /// priority, since the boost source may just have left). Ends with a
    /// scheduling pass.
    pub fn advance_clock(&mut self) {
        let now = self.clock.advance();
        trace!("tick {}", now);
        for i in 0..self.tasks.len() {
            if self.tasks[i].state != TaskState::Blocked {
                continue;
            }
            let Some(deadline) = self.tasks[i].wake_tick else {
                continue;
            };
            if now < deadline {
                continue;
            }
            let id = TaskId(i);
            match self.tasks[i].wait {
                WaitReason::Sleep => {
                    self.make_ready(id, None);
                }
                WaitReason::Mutex(m) => {
                    self.mutexes[m.0].waiters.remove(id);
                    if let Some(holder) = self.mutexes[m.0].holder {
                        self.recompute_inherited(holder);
                    }
                    debug!("task {} timed out on mutex wait", self.tasks[i].name);
                    self.make_ready(id, Some(WaitResult::TimedOut));
                }
                WaitReason::Events { group, .. } => {
                    self.groups[group.0].waiters.remove(id);
                    debug!("task {} timed out on event wait", self.tasks[i].name);
                    self.make_ready(id, Some(WaitResult::TimedOut));
                }
                WaitReason::QueueReceive(q) => {
                    self.queues[q.0].receivers.remove(id);
                    debug!("task {} timed out on queue receive", self.tasks[i].name);
                    self.make_ready(id, Some(WaitResult::TimedOut));
                }
                WaitReason::QueueSend(q) => {
                    self.queues[q.0].senders.remove(id);
                    self.tasks[i].pending_send = None;
                    debug!("task {} timed out on queue send", self.tasks[i].name);
                    self.make_ready(id, Some(WaitResult::TimedOut));
                }
                WaitReason::None => {}
            }
        }
        self.schedule();
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Current tick count.
    #[inline]
    pub fn current_tick(&self) -> u64 {
        self.clock.now()
    }

    /// The task currently holding the CPU, if any.
    #[inline]
    pub fn running_task(&self) -> Option<TaskId> {
        self.running
    }

    pub fn task_state(&self, id: TaskId) -> TaskState {
        self.tasks[id.0].state
    }

    pub fn task_name(&self, id: TaskId) -> ObjectName {
        self.tasks[id.0].name
    }

    pub fn base_priority(&self, id: TaskId) -> Priority {
        self.tasks[id.0].base_priority
    }

    /// Current scheduling priority, including any inherited boost.
    pub fn effective_priority(&self, id: TaskId) -> Priority {
        self.tasks[id.0].effective_priority
    }

    /// Collect the completion of this task's most recent wait. The slot
    /// is cleared; a second call returns `None` until the next wait
    /// completes.
    pub fn take_wait_result(&mut self, id: TaskId) -> Option<WaitResult> {
        self.tasks[id.0].wait_result.take()
    }

    // -----------------------------------------------------------------------
    // Internal machinery shared with the primitive modules
    // -----------------------------------------------------------------------

    /// The running task, or `InvalidArgument` when an operation that
    /// requires a caller is invoked with none.
    pub(crate) fn running_or_err(&self) -> KernelResult<TaskId> {
        self.running.ok_or(KernelError::InvalidArgument)
    }

    /// Next FIFO arrival stamp.
    pub(crate) fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Move a task into the ready queue with a fresh arrival stamp,
    /// clearing its wait bookkeeping and recording the wait's outcome
    /// (when there is one) for later collection.
    pub(crate) fn make_ready(&mut self, id: TaskId, result: Option<WaitResult>) {
        let seq = self.next_seq();
        let tcb = &mut self.tasks[id.0];
        tcb.state = TaskState::Ready;
        tcb.wait = WaitReason::None;
        tcb.wake_tick = None;
        tcb.ready_seq = seq;
        if result.is_some() {
            tcb.wait_result = result;
        }
        let prio = tcb.effective_priority;
        self.ready.insert(id, prio, seq);
    }

    /// Park the running task on a wait list (the caller has already
    /// inserted it into the relevant queue). The CPU is left idle until
    /// the closing `schedule()` picks a successor.
    pub(crate) fn block_running(
        &mut self,
        id: TaskId,
        reason: WaitReason,
        deadline: Option<u64>,
    ) {
        let tcb = &mut self.tasks[id.0];
        tcb.state = TaskState::Blocked;
        tcb.wait = reason;
        tcb.wake_tick = deadline;
        self.running = None;
    }

    /// Change a task's effective priority and propagate the new ordering
    /// to whichever queue the task currently sits in. The Running task
    /// needs no repositioning — the next `schedule()` sees the new value.
    pub(crate) fn set_effective(&mut self, id: TaskId, new: Priority) {
        let old = self.tasks[id.0].effective_priority;
        if new == old {
            return;
        }
        debug!(
            "task {} effective priority {} -> {}",
            self.tasks[id.0].name, old, new
        );
        self.tasks[id.0].effective_priority = new;
        match self.tasks[id.0].state {
            TaskState::Ready => self.ready.reposition(id, new),
            TaskState::Blocked => match self.tasks[id.0].wait {
                WaitReason::Mutex(m) => self.mutexes[m.0].waiters.reposition(id, new),
                WaitReason::Events { group, .. } => {
                    self.groups[group.0].waiters.reposition(id, new)
                }
                WaitReason::QueueReceive(q) => self.queues[q.0].receivers.reposition(id, new),
                WaitReason::QueueSend(q) => self.queues[q.0].senders.reposition(id, new),
                WaitReason::Sleep | WaitReason::None => {}
            },
            _ => {}
        }
    }

    /// The single scheduling decision point. Invoked at the end of every
    /// kernel operation that can change the ready set.
    pub(crate) fn schedule(&mut self) {
        let Some(head_prio) = self.ready.head_priority() else {
            return;
        };
        match self.running {
            None => {
                if let Some(next) = self.ready.pop_head() {
                    self.dispatch(next);
                }
            }
            Some(cur) => {
                // Strict inequality: ties never preempt (no time-slicing).
                if head_prio.is_more_urgent_than(self.tasks[cur.0].effective_priority) {
                    let tcb = &mut self.tasks[cur.0];
                    tcb.state = TaskState::Ready;
                    let (prio, seq) = (tcb.effective_priority, tcb.ready_seq);
                    // Preserved stamp: the preempted task resumes ahead of
                    // equal-priority peers.
                    self.ready.insert(cur, prio, seq);
                    if let Some(next) = self.ready.pop_head() {
                        trace!(
                            "preempt {} -> {}",
                            self.tasks[cur.0].name,
                            self.tasks[next.0].name
                        );
                        self.dispatch(next);
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, id: TaskId) {
        self.tasks[id.0].state = TaskState::Running;
        self.running = Some(id);
        trace!(
            "dispatch {} (priority {})",
            self.tasks[id.0].name,
            self.tasks[id.0].effective_priority
        );
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
