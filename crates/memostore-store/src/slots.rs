//! Per-key task queues.
//!
//! Each identity with outstanding work owns a slot holding its FIFO queue,
//! the start time of the task currently executing and an optional front
//! cache entry. Slots are created on first submission and removed as soon
//! as their queue drains, which also drops the front cache.
//!
//! Tasks are numbered per slot. A front cache entry is only handed to tasks
//! that were queued before it was stored.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::oneshot;

use memostore_core::result::AppResult;
use memostore_core::types::entry::Entry;

/// What a queued task does and where its result goes.
pub(crate) enum Operation {
    /// Fetch or generate the entry.
    Get(oneshot::Sender<AppResult<Entry>>),
    /// Remove the entry. `None` when nobody awaits the outcome.
    Delete(Option<oneshot::Sender<AppResult<()>>>),
}

impl Operation {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Get(_) => "get",
            Self::Delete(_) => "delete",
        }
    }
}

/// One pending operation against a single identity.
pub(crate) struct Task {
    /// The original key.
    pub key: Value,
    /// Operation kind and reply channel.
    pub op: Operation,
}

/// A dequeued task ready to execute.
pub(crate) struct Started {
    /// The task itself.
    pub task: Task,
    /// When execution began.
    pub started_at: DateTime<Utc>,
    /// Front cache contents at the time the task began.
    pub front: Option<Entry>,
}

#[derive(Default)]
struct KeySlot {
    queue: VecDeque<(u64, Task)>,
    running: Option<DateTime<Utc>>,
    front: Option<Entry>,
    /// Sequence number of the next queued task.
    next_seq: u64,
    /// Tasks numbered below this may use `front`.
    front_limit: u64,
}

impl KeySlot {
    fn push(&mut self, task: Task) {
        self.queue.push_back((self.next_seq, task));
        self.next_seq += 1;
    }
}

/// Table of per-identity slots.
#[derive(Default)]
pub(crate) struct SlotTable {
    slots: Mutex<HashMap<String, KeySlot>>,
}

impl SlotTable {
    /// Queue a task. Returns `true` when the identity had no slot, in which
    /// case the caller must start a runner for it.
    pub(crate) fn enqueue(&self, identity: &str, task: Task) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        match slots.get_mut(identity) {
            Some(slot) => {
                slot.push(task);
                false
            }
            None => {
                let mut slot = KeySlot::default();
                slot.push(task);
                slots.insert(identity.to_string(), slot);
                true
            }
        }
    }

    /// Dequeue the next task for an identity and mark it running. When the
    /// queue is empty the slot, its running marker and its front cache are
    /// discarded and `None` is returned.
    pub(crate) fn begin_next(&self, identity: &str) -> Option<Started> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let slot = slots.get_mut(identity)?;

        match slot.queue.pop_front() {
            Some((seq, task)) => {
                let started_at = Utc::now();
                slot.running = Some(started_at);
                let front = if seq < slot.front_limit {
                    slot.front.clone()
                } else {
                    None
                };
                Some(Started {
                    task,
                    started_at,
                    front,
                })
            }
            None => {
                slots.remove(identity);
                None
            }
        }
    }

    /// Store a freshly generated entry in the identity's front cache for
    /// the tasks currently queued behind it.
    pub(crate) fn cache(&self, identity: &str, entry: Entry) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.get_mut(identity) {
            slot.front = Some(entry);
            slot.front_limit = slot.next_seq;
        }
    }

    /// Drop the identity's front cache entry.
    pub(crate) fn evict(&self, identity: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.get_mut(identity) {
            slot.front = None;
        }
    }

    /// Number of identities with queued or running work.
    pub(crate) fn active(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Start time of the task currently running for an identity.
    pub(crate) fn running_since(&self, identity: &str) -> Option<DateTime<Utc>> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(identity).and_then(|slot| slot.running)
    }
}
