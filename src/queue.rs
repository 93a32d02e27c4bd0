//! # Message Queue
//!
//! Bounded FIFO channel of fixed-size messages with blocking send and
//! receive. Message order is strict FIFO regardless of sender priority;
//! only the *wait lists* are priority-ordered. A send that finds a blocked
//! receiver hands the message over directly instead of bouncing it through
//! the ring buffer.

use log::{debug, trace};

use heapless::{Deque, Vec};

use crate::config::{MAX_MESSAGE_SIZE, MAX_QUEUE_CAPACITY};
use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::schedq::SchedQueue;
use crate::task::{Completion, ObjectName, Timeout, WaitReason, WaitResult};

/// Opaque queue handle — an index into the kernel's queue arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueId(pub(crate) usize);

/// A queued message. Bounded by the compile-time maximum; the per-queue
/// `message_size` limit is enforced at send time.
pub type Message = Vec<u8, MAX_MESSAGE_SIZE>;

/// Bounded ring of fixed-size messages plus its two wait lists.
///
/// Invariant: `ring.len() <= capacity` at all times, and a task sits in
/// at most one of `senders` / `receivers`.
#[derive(Debug)]
pub struct MessageQueue {
    pub(crate) name: ObjectName,
    pub(crate) capacity: usize,
    pub(crate) message_size: usize,
    pub(crate) ring: Deque<Message, MAX_QUEUE_CAPACITY>,
    pub(crate) senders: SchedQueue,
    pub(crate) receivers: SchedQueue,
}

impl Kernel {
    /// Create a queue. Capacity and message size are fixed for the life
    /// of the queue; zero or over-maximum values are `InvalidArgument`.
    pub fn create_queue(
        &mut self,
        name: ObjectName,
        capacity: usize,
        message_size: usize,
    ) -> KernelResult<QueueId> {
        if capacity == 0
            || capacity > MAX_QUEUE_CAPACITY
            || message_size == 0
            || message_size > MAX_MESSAGE_SIZE
        {
            return Err(KernelError::InvalidArgument);
        }
        let id = QueueId(self.queues.len());
        self.queues
            .push(MessageQueue {
                name,
                capacity,
                message_size,
                ring: Deque::new(),
                senders: SchedQueue::new(),
                receivers: SchedQueue::new(),
            })
            .map_err(|_| KernelError::ResourceExhausted)?;
        debug!(
            "queue {} created: {} x {} bytes",
            name, capacity, message_size
        );
        Ok(id)
    }

    /// Send a message on behalf of the running task.
    ///
    /// A message longer than the queue's fixed size is `InvalidArgument`.
    /// If a receiver is already blocked, the highest-priority one takes
    /// delivery directly. Otherwise the message is enqueued, or — when the
    /// ring is at capacity — the sender blocks carrying its message
    /// (`NoWait` fails with `Full` instead).
    pub fn queue_send(
        &mut self,
        queue: QueueId,
        bytes: &[u8],
        timeout: Timeout,
    ) -> KernelResult<Completion<()>> {
        let cur = self.running_or_err()?;
        if bytes.len() > self.queues[queue.0].message_size {
            return Err(KernelError::InvalidArgument);
        }
        let msg = Message::from_slice(bytes).map_err(|_| KernelError::InvalidArgument)?;

        if let Some(rx) = self.queues[queue.0].receivers.pop_head() {
            // Direct delivery: a blocked receiver means the ring is empty,
            // so FIFO order is preserved without the buffer hop.
            trace!(
                "queue {}: direct delivery to {}",
                self.queues[queue.0].name,
                self.tasks[rx.0].name
            );
            self.make_ready(rx, Some(WaitResult::Message(msg)));
            self.schedule();
            return Ok(Completion::Ready(()));
        }

        if self.queues[queue.0].ring.len() < self.queues[queue.0].capacity {
            // Within capacity by the check above.
            let _ = self.queues[queue.0].ring.push_back(msg);
            return Ok(Completion::Ready(()));
        }

        if timeout == Timeout::NoWait {
            return Err(KernelError::Full);
        }
        trace!(
            "queue {}: full, task {} blocks sending",
            self.queues[queue.0].name,
            self.tasks[cur.0].name
        );
        let prio = self.tasks[cur.0].effective_priority;
        let seq = self.next_seq();
        self.queues[queue.0].senders.insert(cur, prio, seq);
        self.tasks[cur.0].pending_send = Some(msg);
        let deadline = timeout.deadline(self.clock.now());
        self.block_running(cur, WaitReason::QueueSend(queue), deadline);
        self.schedule();
        Ok(Completion::Pending)
    }

    /// Receive the oldest message on behalf of the running task.
    ///
    /// Dequeuing frees a slot: the highest-priority blocked sender (if
    /// any) has its message promoted into the ring and is woken with
    /// `WaitResult::Sent`. An empty queue blocks the caller (`NoWait`
    /// fails with `Timeout`).
    pub fn queue_receive(
        &mut self,
        queue: QueueId,
        timeout: Timeout,
    ) -> KernelResult<Completion<Message>> {
        let cur = self.running_or_err()?;
        if let Some(msg) = self.queues[queue.0].ring.pop_front() {
            if let Some(tx) = self.queues[queue.0].senders.pop_head() {
                if let Some(pending) = self.tasks[tx.0].pending_send.take() {
                    let _ = self.queues[queue.0].ring.push_back(pending);
                }
                trace!(
                    "queue {}: blocked sender {} completes",
                    self.queues[queue.0].name,
                    self.tasks[tx.0].name
                );
                self.make_ready(tx, Some(WaitResult::Sent));
                self.schedule();
            }
            return Ok(Completion::Ready(msg));
        }

        if timeout == Timeout::NoWait {
            return Err(KernelError::Timeout);
        }
        let prio = self.tasks[cur.0].effective_priority;
        let seq = self.next_seq();
        self.queues[queue.0].receivers.insert(cur, prio, seq);
        let deadline = timeout.deadline(self.clock.now());
        self.block_running(cur, WaitReason::QueueReceive(queue), deadline);
        self.schedule();
        Ok(Completion::Pending)
    }

    /// Number of messages currently buffered.
    pub fn queued_messages(&self, queue: QueueId) -> usize {
        self.queues[queue.0].ring.len()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
