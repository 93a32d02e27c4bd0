//! # Event-Flag Group
//!
//! One-to-many / many-to-one rendezvous signaling over a 32-bit flag set.
//! Senders OR flags in and never block; receivers wait for any or all of a
//! requested mask. The demo pattern is a logging server blocked on the
//! union of every event it logs, woken the moment any producer signals.
//!
//! Flags persist until explicitly cleared (the demo semantics) unless the
//! group was created with [`ClearPolicy::ClearOnReceive`], in which case a
//! satisfied waiter consumes the bits it received.

use bitflags::bitflags;
use log::{debug, trace};

use heapless::Vec;

use crate::config::MAX_TASKS;
use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::schedq::SchedQueue;
use crate::task::{Completion, ObjectName, TaskId, Timeout, WaitReason, WaitResult};

/// Opaque event-group handle — an index into the kernel's group arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupId(pub(crate) usize);

bitflags! {
    /// A set of event flags. 32 independent flags per group.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventSet: u32 {
        const EVENT_0 = 1 << 0;
        const EVENT_1 = 1 << 1;
        const EVENT_2 = 1 << 2;
        const EVENT_3 = 1 << 3;
        const EVENT_4 = 1 << 4;
        const EVENT_5 = 1 << 5;
        const EVENT_6 = 1 << 6;
        const EVENT_7 = 1 << 7;
        const EVENT_8 = 1 << 8;
        const EVENT_9 = 1 << 9;
        const EVENT_10 = 1 << 10;
        const EVENT_11 = 1 << 11;
        const EVENT_12 = 1 << 12;
        const EVENT_13 = 1 << 13;
        const EVENT_14 = 1 << 14;
        const EVENT_15 = 1 << 15;
        const EVENT_16 = 1 << 16;
        const EVENT_17 = 1 << 17;
        const EVENT_18 = 1 << 18;
        const EVENT_19 = 1 << 19;
        const EVENT_20 = 1 << 20;
        const EVENT_21 = 1 << 21;
        const EVENT_22 = 1 << 22;
        const EVENT_23 = 1 << 23;
        const EVENT_24 = 1 << 24;
        const EVENT_25 = 1 << 25;
        const EVENT_26 = 1 << 26;
        const EVENT_27 = 1 << 27;
        const EVENT_28 = 1 << 28;
        const EVENT_29 = 1 << 29;
        const EVENT_30 = 1 << 30;
        const EVENT_31 = 1 << 31;
    }
}

/// How a receive's requested mask combines with the asserted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Satisfied by a non-empty intersection; delivers the intersection.
    Any,
    /// Satisfied only when every requested bit is asserted; delivers the
    /// full mask.
    All,
}

/// Whether a satisfied receive consumes the bits it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearPolicy {
    /// Flags persist until `event_clear` — the demo semantics.
    NoClear,
    /// A satisfied waiter clears the bits it received.
    ClearOnReceive,
}

/// Event-flag group record.
#[derive(Debug)]
pub struct EventGroup {
    pub(crate) name: ObjectName,
    pub(crate) asserted: EventSet,
    pub(crate) policy: ClearPolicy,
    pub(crate) waiters: SchedQueue,
}

fn satisfied(asserted: EventSet, mask: EventSet, mode: WaitMode) -> bool {
    match mode {
        WaitMode::Any => asserted.intersects(mask),
        WaitMode::All => asserted.contains(mask),
    }
}

fn delivered(asserted: EventSet, mask: EventSet, mode: WaitMode) -> EventSet {
    match mode {
        WaitMode::Any => asserted & mask,
        WaitMode::All => mask,
    }
}

impl Kernel {
    /// Create an event-flag group with no flags asserted.
    pub fn create_event_group(
        &mut self,
        name: ObjectName,
        policy: ClearPolicy,
    ) -> KernelResult<GroupId> {
        let id = GroupId(self.groups.len());
        self.groups
            .push(EventGroup {
                name,
                asserted: EventSet::empty(),
                policy,
                waiters: SchedQueue::new(),
            })
            .map_err(|_| KernelError::ResourceExhausted)?;
        debug!("event group {} created", name);
        Ok(id)
    }

    /// Assert flags and wake every satisfied waiter, in priority order.
    ///
    /// Never blocks the caller and needs no running task, so it can be
    /// driven from interrupt context. Re-asserting a set bit is a no-op
    /// with respect to the asserted set (signaling is idempotent), and no
    /// signal is ever lost: flags from back-to-back sends accumulate until
    /// received or cleared.
    pub fn event_send(&mut self, group: GroupId, mask: EventSet) {
        self.groups[group.0].asserted |= mask;
        trace!(
            "event group {}: send {:#06x}, asserted {:#06x}",
            self.groups[group.0].name,
            mask.bits(),
            self.groups[group.0].asserted.bits()
        );
        // Waiters are evaluated sequentially in scheduling order, so a
        // clear-on-receive group consumes bits as it goes and a later
        // waiter sees what the earlier ones left.
        let queued: Vec<TaskId, MAX_TASKS> = self.groups[group.0].waiters.tasks().collect();
        for id in queued {
            let WaitReason::Events {
                mask: wanted,
                mode,
                ..
            } = self.tasks[id.0].wait
            else {
                continue;
            };
            let asserted = self.groups[group.0].asserted;
            if !satisfied(asserted, wanted, mode) {
                continue;
            }
            let bits = delivered(asserted, wanted, mode);
            if self.groups[group.0].policy == ClearPolicy::ClearOnReceive {
                self.groups[group.0].asserted.remove(bits);
            }
            self.groups[group.0].waiters.remove(id);
            trace!(
                "event group {}: task {} satisfied with {:#06x}",
                self.groups[group.0].name,
                self.tasks[id.0].name,
                bits.bits()
            );
            self.make_ready(id, Some(WaitResult::Events(bits)));
        }
        self.schedule();
    }

    /// Receive flags on behalf of the running task.
    ///
    /// Returns immediately when the mode's condition already holds;
    /// otherwise blocks until a later `event_send` satisfies it, or fails
    /// with `Timeout` when the bounded wait expires (`NoWait` fails at
    /// once). An empty mask is `InvalidArgument`.
    pub fn event_receive(
        &mut self,
        group: GroupId,
        mask: EventSet,
        mode: WaitMode,
        timeout: Timeout,
    ) -> KernelResult<Completion<EventSet>> {
        if mask.is_empty() {
            return Err(KernelError::InvalidArgument);
        }
        let cur = self.running_or_err()?;
        let asserted = self.groups[group.0].asserted;
        if satisfied(asserted, mask, mode) {
            let bits = delivered(asserted, mask, mode);
            if self.groups[group.0].policy == ClearPolicy::ClearOnReceive {
                self.groups[group.0].asserted.remove(bits);
            }
            return Ok(Completion::Ready(bits));
        }
        if timeout == Timeout::NoWait {
            return Err(KernelError::Timeout);
        }
        let prio = self.tasks[cur.0].effective_priority;
        let seq = self.next_seq();
        self.groups[group.0].waiters.insert(cur, prio, seq);
        let deadline = timeout.deadline(self.clock.now());
        self.block_running(cur, WaitReason::Events { group, mask, mode }, deadline);
        self.schedule();
        Ok(Completion::Pending)
    }

    /// Explicitly clear flags. Clearing never satisfies a wait, so no
    /// waiter evaluation happens here.
    pub fn event_clear(&mut self, group: GroupId, mask: EventSet) {
        self.groups[group.0].asserted.remove(mask);
    }

    /// Currently asserted flags.
    pub fn asserted_events(&self, group: GroupId) -> EventSet {
        self.groups[group.0].asserted
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
