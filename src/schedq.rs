//! # Scheduling Queue
//!
//! The one ordered-collection type behind both the ready structure and
//! every primitive's wait list: tasks sorted by effective priority, with
//! FIFO tie-break among equals via a kernel-wide arrival stamp.
//!
//! Keeping the two concerns in one type means the tie-break rules cannot
//! drift apart between the ready queue and the wait lists.

use heapless::Vec;

use crate::config::MAX_TASKS;
use crate::task::{Priority, TaskId};

#[derive(Debug, Clone, Copy)]
struct Entry {
    task: TaskId,
    priority: Priority,
    seq: u64,
}

/// Priority-ordered task queue with FIFO tie-break.
///
/// Entries are kept sorted by `(priority, seq)` ascending, so index 0 is
/// always the most urgent, earliest-arrived task. Linear insertion is fine
/// at these table sizes (`MAX_TASKS` = 16).
#[derive(Debug)]
pub struct SchedQueue {
    entries: Vec<Entry, MAX_TASKS>,
}

impl SchedQueue {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a task at its ordered position. A task must not already be
    /// queued here; the kernel guarantees a task is in at most one queue.
    pub fn insert(&mut self, task: TaskId, priority: Priority, seq: u64) {
        let pos = self
            .entries
            .iter()
            .position(|e| (e.priority, e.seq) > (priority, seq))
            .unwrap_or(self.entries.len());
        // Capacity equals the task table size, so this cannot overflow.
        let _ = self.entries.insert(pos, Entry { task, priority, seq });
    }

    /// Remove a task wherever it sits. Returns whether it was present.
    pub fn remove(&mut self, task: TaskId) -> bool {
        match self.entries.iter().position(|e| e.task == task) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Re-order a queued task after a priority change, keeping its
    /// original arrival stamp.
    pub fn reposition(&mut self, task: TaskId, priority: Priority) {
        if let Some(pos) = self.entries.iter().position(|e| e.task == task) {
            let seq = self.entries[pos].seq;
            self.entries.remove(pos);
            self.insert(task, priority, seq);
        }
    }

    /// Most urgent queued task, if any.
    pub fn head(&self) -> Option<TaskId> {
        self.entries.first().map(|e| e.task)
    }

    /// Priority of the most urgent queued task, if any.
    pub fn head_priority(&self) -> Option<Priority> {
        self.entries.first().map(|e| e.priority)
    }

    /// Remove and return the most urgent queued task.
    pub fn pop_head(&mut self) -> Option<TaskId> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0).task)
        }
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.entries.iter().any(|e| e.task == task)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Queued tasks in scheduling order.
    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.entries.iter().map(|e| e.task)
    }
}
