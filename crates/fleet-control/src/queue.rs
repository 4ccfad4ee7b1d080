//! A de-duplicating work queue.
//!
//! A key is queued at most once. A key added while it is being worked on is
//! marked dirty and queued again when that work finishes, so no change is
//! lost and no key is ever worked on twice at once.

use fleet_store::ObjectKey;
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<ObjectKey>,
    queued: BTreeSet<ObjectKey>,
    in_flight: BTreeSet<ObjectKey>,
    dirty: BTreeSet<ObjectKey>,
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    ready: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, key: ObjectKey) {
        {
            let mut state = self.state.lock();
            if state.in_flight.contains(&key) {
                state.dirty.insert(key);
                return;
            }
            if !state.queued.insert(key.clone()) {
                return;
            }
            state.pending.push_back(key);
        }
        self.ready.notify_one();
    }

    /// Take the next key, if any, marking it in flight.
    pub fn try_pop(&self) -> Option<ObjectKey> {
        let mut state = self.state.lock();
        let key = state.pending.pop_front()?;
        state.queued.remove(&key);
        state.in_flight.insert(key.clone());
        Some(key)
    }

    /// Wait for the next key.
    pub async fn pop(&self) -> ObjectKey {
        loop {
            let notified = self.ready.notified();
            if let Some(key) = self.try_pop() {
                return key;
            }
            notified.await;
        }
    }

    /// Mark work on `key` finished, re-queueing it if it changed meanwhile.
    pub fn done(&self, key: &ObjectKey) {
        let requeue = {
            let mut state = self.state.lock();
            state.in_flight.remove(key);
            state.dirty.remove(key)
        };
        if requeue {
            self.add(key.clone());
        }
    }

    /// Nothing queued and nothing in flight.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.pending.is_empty() && state.in_flight.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
