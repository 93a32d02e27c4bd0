//! # Priority-Inheritance Mutex
//!
//! A binary lock with a priority-ordered wait list. While a task holds the
//! lock and a more urgent task is queued behind it, the holder runs at the
//! waiter's priority — bounding priority inversion to the length of the
//! critical section instead of the execution of every intervening
//! medium-priority task.
//!
//! ## Effective-priority invariant
//!
//! A task's effective priority is always the most urgent of its base
//! priority and the head waiter of every mutex it holds. All three events
//! that can disturb that value — a new waiter arriving, a waiter timing
//! out, a mutex being released — funnel through
//! [`Kernel::recompute_inherited`], so there is no single saved-priority
//! field to get stale under nested locking.

use log::{debug, trace};

use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::schedq::SchedQueue;
use crate::task::{Completion, ObjectName, TaskId, Timeout, WaitReason, WaitResult};

/// Opaque mutex handle — an index into the kernel's mutex arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutexId(pub(crate) usize);

/// Binary lock record. Created once at system start, never destroyed.
#[derive(Debug)]
pub struct Mutex {
    pub(crate) name: ObjectName,
    pub(crate) holder: Option<TaskId>,
    pub(crate) waiters: SchedQueue,
}

impl Kernel {
    /// Create a mutex, initially free.
    pub fn create_mutex(&mut self, name: ObjectName) -> KernelResult<MutexId> {
        let id = MutexId(self.mutexes.len());
        self.mutexes
            .push(Mutex {
                name,
                holder: None,
                waiters: SchedQueue::new(),
            })
            .map_err(|_| KernelError::ResourceExhausted)?;
        debug!("mutex {} created", name);
        Ok(id)
    }

    /// Acquire the mutex on behalf of the running task.
    ///
    /// Free: the caller becomes holder in O(1). Held: the caller joins the
    /// wait list ordered by effective priority and blocks; if it outranks
    /// the holder, the holder inherits its priority on the spot (which can
    /// itself decide the next dispatch). `Timeout::NoWait` on a held mutex
    /// fails immediately with `Timeout`.
    ///
    /// Re-entrant obtain is rejected with `InvalidArgument` — the lock is
    /// not recursive.
    pub fn obtain(&mut self, mutex: MutexId, timeout: Timeout) -> KernelResult<Completion<()>> {
        let cur = self.running_or_err()?;
        match self.mutexes[mutex.0].holder {
            None => {
                self.mutexes[mutex.0].holder = Some(cur);
                // Capacity equals MAX_MUTEXES; a held mutex appears once.
                let _ = self.tasks[cur.0].held.push(mutex);
                trace!(
                    "task {} obtained mutex {}",
                    self.tasks[cur.0].name,
                    self.mutexes[mutex.0].name
                );
                Ok(Completion::Ready(()))
            }
            Some(holder) if holder == cur => Err(KernelError::InvalidArgument),
            Some(holder) => {
                if timeout == Timeout::NoWait {
                    return Err(KernelError::Timeout);
                }
                trace!(
                    "task {} blocks on mutex {} held by {}",
                    self.tasks[cur.0].name,
                    self.mutexes[mutex.0].name,
                    self.tasks[holder.0].name
                );
                let prio = self.tasks[cur.0].effective_priority;
                let seq = self.next_seq();
                self.mutexes[mutex.0].waiters.insert(cur, prio, seq);
                let deadline = timeout.deadline(self.clock.now());
                self.block_running(cur, WaitReason::Mutex(mutex), deadline);
                // The new head waiter may outrank the holder: inherit now.
                self.recompute_inherited(holder);
                self.schedule();
                Ok(Completion::Pending)
            }
        }
    }

    /// Release the mutex. The holder's effective priority drops back to
    /// its remaining obligations (base priority, or the head waiter of
    /// another mutex it still holds); the most urgent waiter, if any,
    /// becomes the new holder and is woken with `WaitResult::MutexAcquired`.
    ///
    /// Releasing a mutex the caller does not hold is `InvalidArgument`.
    pub fn release(&mut self, mutex: MutexId) -> KernelResult<()> {
        let cur = self.running_or_err()?;
        if self.mutexes[mutex.0].holder != Some(cur) {
            return Err(KernelError::InvalidArgument);
        }
        self.release_owned(cur, mutex);
        self.schedule();
        Ok(())
    }

    /// Holder of the mutex, if any.
    pub fn mutex_holder(&self, mutex: MutexId) -> Option<TaskId> {
        self.mutexes[mutex.0].holder
    }

    /// Ownership transfer shared by `release` and `delete_self`. Does not
    /// run the scheduling pass; the caller does.
    pub(crate) fn release_owned(&mut self, owner: TaskId, mutex: MutexId) {
        if let Some(pos) = self.tasks[owner.0].held.iter().position(|&m| m == mutex) {
            self.tasks[owner.0].held.remove(pos);
        }
        trace!(
            "task {} released mutex {}",
            self.tasks[owner.0].name,
            self.mutexes[mutex.0].name
        );
        // Restore to base priority or the next-highest obligation.
        self.recompute_inherited(owner);
        if let Some(next) = self.mutexes[mutex.0].waiters.pop_head() {
            self.mutexes[mutex.0].holder = Some(next);
            let _ = self.tasks[next.0].held.push(mutex);
            self.make_ready(next, Some(WaitResult::MutexAcquired));
            // The new holder may itself owe an inherited boost to the
            // waiters still queued behind it.
            self.recompute_inherited(next);
        } else {
            self.mutexes[mutex.0].holder = None;
        }
    }

    /// Re-derive a task's effective priority from its base priority and
    /// the head waiter of every mutex it holds, then propagate the new
    /// ordering to whichever queue the task sits in.
    pub(crate) fn recompute_inherited(&mut self, id: TaskId) {
        let mut effective = self.tasks[id.0].base_priority;
        for k in 0..self.tasks[id.0].held.len() {
            let m = self.tasks[id.0].held[k];
            if let Some(head) = self.mutexes[m.0].waiters.head_priority() {
                if head.is_more_urgent_than(effective) {
                    effective = head;
                }
            }
        }
        self.set_effective(id, effective);
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
