//! # Kernel Configuration
//!
//! Compile-time constants governing kernel capacity. All limits are fixed
//! at compile time — no dynamic allocation anywhere in the kernel.

/// Maximum number of tasks the kernel can manage simultaneously.
/// This bounds the task table. Task slots are never reused: a terminated
/// task still occupies its slot, so this is a lifetime budget, not a
/// concurrency budget.
pub const MAX_TASKS: usize = 16;

/// Maximum number of mutexes that can be created.
pub const MAX_MUTEXES: usize = 8;

/// Maximum number of event-flag groups that can be created.
pub const MAX_EVENT_GROUPS: usize = 4;

/// Maximum number of message queues that can be created.
pub const MAX_QUEUES: usize = 4;

/// Upper bound on any queue's capacity (messages). A queue's actual
/// capacity is chosen at creation and may be smaller.
pub const MAX_QUEUE_CAPACITY: usize = 128;

/// Upper bound on any queue's message size in bytes. A queue's actual
/// message size is chosen at creation and may be smaller.
pub const MAX_MESSAGE_SIZE: usize = 64;

/// Least urgent priority value. Priorities are `u8` with lower values
/// meaning higher urgency; 255 is the idle floor.
pub const IDLE_PRIORITY: u8 = 255;
