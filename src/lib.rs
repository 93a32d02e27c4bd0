//! # tickos — Tick-Driven RTOS Kernel Core
//!
//! A small preemptive, fixed-priority real-time kernel core: a task
//! scheduler plus the three inter-task primitives built on it —
//! priority-inheritance mutexes, event-flag groups, and bounded FIFO
//! message queues.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Task bodies (external collaborators)        │
//! ├───────────────┬──────────────────┬──────────────────────┤
//! │  Mutex        │  Event Group     │  Message Queue       │
//! │  mutex.rs     │  event.rs        │  queue.rs            │
//! │  ─ obtain()   │  ─ event_send()  │  ─ queue_send()      │
//! │  ─ release()  │  ─ event_receive │  ─ queue_receive()   │
//! ├───────────────┴──────────────────┴──────────────────────┤
//! │             Scheduler Core (kernel.rs)                   │
//! │   task table · ready queue · schedule() · advance_clock  │
//! ├─────────────────────────────────────────────────────────┤
//! │  Task model (task.rs) · SchedQueue (schedq.rs)           │
//! ├─────────────────────────────────────────────────────────┤
//! │             Logical Clock (clock.rs)                     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution model
//!
//! There is one logical CPU and no time-slicing. The kernel is an
//! explicitly passed [`Kernel`] context; every record lives in a
//! fixed-capacity arena and handles are indices, so nothing dangles.
//! Blocking is data, not control flow: a blocking call made on behalf of
//! the Running task either completes immediately
//! ([`Completion::Ready`](task::Completion)) or parks the caller on a
//! priority-ordered wait list ([`Completion::Pending`](task::Completion)).
//! The wait's eventual outcome is recorded as a
//! [`WaitResult`](task::WaitResult) for the task to collect when it next
//! runs.
//!
//! Scheduling is fully preemptive: any operation that makes a strictly
//! more urgent task Ready switches to it before the operation returns.
//! Among equal priorities, arrival order rules — a task runs to its next
//! blocking point or voluntary yield.
//!
//! The clock never advances by itself. The external driver (timer
//! interrupt in production, test harness on the host) calls
//! [`Kernel::advance_clock`] once per logical tick; that is where timed
//! sleeps wake and bounded waits expire.
//!
//! ## Memory model
//!
//! - No heap, no `alloc`: every collection is a `heapless` fixed-capacity
//!   structure sized by the constants in [`config`]
//! - Handles are indices into non-reusing arenas
//! - `&mut self` is the only concurrency story: the kernel itself is the
//!   sole arbiter of scheduling, so primitive calls are atomic with
//!   respect to scheduling decisions by construction

#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod kernel;
pub mod mutex;
pub mod queue;
pub mod schedq;
pub mod task;

pub use error::{KernelError, KernelResult};
pub use event::{ClearPolicy, EventSet, GroupId, WaitMode};
pub use kernel::Kernel;
pub use mutex::MutexId;
pub use queue::{Message, QueueId};
pub use task::{Completion, ObjectName, Priority, TaskId, TaskState, Timeout, WaitResult};
