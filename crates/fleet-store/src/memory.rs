//! In-memory object store.
//!
//! The reference [`ObjectStore`]:
//! - objects by key, ordered, under a single lock
//! - owner index (owner key → dependent keys) updated in the same critical
//!   section as the object it describes
//! - optimistic concurrency on resource versions
//! - controller-owner garbage collection on delete
//! - a broadcast watch stream of effective changes

use crate::error::StoreError;
use crate::jsonl::{read_objects_from_path, write_objects_to_path};
use crate::object::{ObjectKey, RawObject, STATUS_FIELD};
use crate::store::{EventType, ObjectStore, WatchEvent};
use async_trait::async_trait;
use chrono::Utc;
use fleet_kernel::LabelSelector;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

const WATCH_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<ObjectKey, RawObject>,
    owners: BTreeMap<ObjectKey, BTreeSet<ObjectKey>>,
    last_version: u64,
}

impl State {
    fn next_version(&mut self) -> u64 {
        self.last_version += 1;
        self.last_version
    }

    fn owner_keys(object: &RawObject) -> impl Iterator<Item = ObjectKey> + '_ {
        object.metadata.owner_references.iter().map(|owner| {
            ObjectKey::new(&owner.kind, &object.metadata.namespace, &owner.name)
        })
    }

    fn index(&mut self, object: &RawObject) {
        let key = object.key();
        for owner in Self::owner_keys(object) {
            self.owners.entry(owner).or_default().insert(key.clone());
        }
    }

    fn unindex(&mut self, object: &RawObject) {
        let key = object.key();
        for owner in Self::owner_keys(object) {
            if let Some(dependents) = self.owners.get_mut(&owner) {
                dependents.remove(&key);
                if dependents.is_empty() {
                    self.owners.remove(&owner);
                }
            }
        }
    }

    fn insert(&mut self, object: RawObject) {
        if let Some(previous) = self.objects.get(&object.key()).cloned() {
            self.unindex(&previous);
        }
        self.index(&object);
        self.objects.insert(object.key(), object);
    }

    fn remove(&mut self, key: &ObjectKey) -> Option<RawObject> {
        let removed = self.objects.remove(key)?;
        self.unindex(&removed);
        Some(removed)
    }

    /// The stored object for a versioned write, or the reason it is refused.
    fn check_version(&self, object: &RawObject) -> Result<&RawObject, StoreError> {
        let key = object.key();
        let stored = self
            .objects
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        if stored.metadata.resource_version != object.metadata.resource_version {
            return Err(StoreError::Conflict {
                key,
                expected: object.metadata.resource_version,
                actual: stored.metadata.resource_version,
            });
        }
        Ok(stored)
    }
}

pub struct MemoryStore {
    state: Mutex<State>,
    events: broadcast::Sender<WatchEvent>,
    writes: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("objects", &self.len())
            .field("writes", &self.write_count())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            state: Mutex::new(State::default()),
            events,
            writes: AtomicU64::new(0),
        }
    }

    /// Build a store from already-persisted objects.
    ///
    /// Uids, versions and timestamps are kept as given; objects that never had
    /// them get fresh ones. Duplicate keys resolve last-write-wins.
    pub fn from_objects(objects: Vec<RawObject>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            state.last_version = objects
                .iter()
                .map(|o| o.metadata.resource_version)
                .max()
                .unwrap_or(0);
            for mut object in objects {
                if object.metadata.uid.is_empty() {
                    object.metadata.uid = uuid::Uuid::new_v4().to_string();
                }
                if object.metadata.resource_version == 0 {
                    object.metadata.resource_version = state.next_version();
                }
                state.insert(object);
            }
        }
        store
    }

    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::from_objects(read_objects_from_path(path)?))
    }

    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        write_objects_to_path(path, &self.snapshot())?;
        Ok(())
    }

    /// Every object, in key order.
    pub fn snapshot(&self) -> Vec<RawObject> {
        self.state.lock().objects.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn publish(&self, event_type: EventType, object: &RawObject) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        // No subscribers is fine.
        let _ = self.events.send(WatchEvent {
            event_type,
            object: object.clone(),
        });
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_raw(&self, key: &ObjectKey) -> Result<Option<RawObject>, StoreError> {
        Ok(self.state.lock().objects.get(key).cloned())
    }

    async fn list_raw(
        &self,
        kind: &str,
        namespace: Option<&str>,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<RawObject>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .objects
            .values()
            .filter(|o| o.kind == kind)
            .filter(|o| namespace.is_none_or(|ns| o.metadata.namespace == ns))
            .filter(|o| selector.is_none_or(|s| s.matches(&o.metadata.labels)))
            .cloned()
            .collect())
    }

    async fn create_raw(&self, mut object: RawObject) -> Result<RawObject, StoreError> {
        let created = {
            let mut state = self.state.lock();
            let key = object.key();
            if state.objects.contains_key(&key) {
                return Err(StoreError::AlreadyExists(key));
            }
            object.metadata.uid = uuid::Uuid::new_v4().to_string();
            object.metadata.resource_version = state.next_version();
            object.metadata.creation_timestamp = Some(Utc::now());
            state.insert(object.clone());
            object
        };
        self.publish(EventType::Added, &created);
        Ok(created)
    }

    async fn update_raw(&self, object: RawObject) -> Result<RawObject, StoreError> {
        let updated = {
            let mut state = self.state.lock();
            let stored = state.check_version(&object)?;

            let mut next = stored.clone();
            next.api_version = object.api_version.clone();
            next.metadata.labels = object.metadata.labels.clone();
            next.metadata.owner_references = object.metadata.owner_references.clone();
            next.body = object.without_status();
            if let Some(status) = stored.status() {
                next.body.insert(STATUS_FIELD.to_string(), status.clone());
            }
            if &next == stored {
                return Ok(next);
            }

            next.metadata.resource_version = state.next_version();
            state.insert(next.clone());
            next
        };
        self.publish(EventType::Modified, &updated);
        Ok(updated)
    }

    async fn update_status_raw(&self, object: RawObject) -> Result<RawObject, StoreError> {
        let updated = {
            let mut state = self.state.lock();
            let stored = state.check_version(&object)?;

            let mut next = stored.clone();
            match object.status() {
                Some(status) => next.body.insert(STATUS_FIELD.to_string(), status.clone()),
                None => next.body.remove(STATUS_FIELD),
            };
            if &next == stored {
                return Ok(next);
            }

            next.metadata.resource_version = state.next_version();
            state.insert(next.clone());
            next
        };
        self.publish(EventType::Modified, &updated);
        Ok(updated)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<bool, StoreError> {
        let removed = {
            let mut state = self.state.lock();
            let mut removed = Vec::new();
            let mut pending = vec![key.clone()];
            while let Some(next) = pending.pop() {
                let Some(object) = state.remove(&next) else {
                    continue;
                };
                // Dependents this object controls go with it.
                if let Some(dependents) = state.owners.get(&next) {
                    for dependent in dependents {
                        if let Some(candidate) = state.objects.get(dependent)
                            && candidate.metadata.controller().is_some_and(|c| {
                                c.refers_to(&next.kind, &next.name)
                                    && (c.uid.is_empty() || c.uid == object.metadata.uid)
                            })
                        {
                            pending.push(dependent.clone());
                        }
                    }
                }
                removed.push(object);
            }
            removed
        };

        for object in &removed {
            tracing::debug!(key = %object.key(), "deleted");
            self.publish(EventType::Deleted, object);
        }
        Ok(!removed.is_empty())
    }

    async fn list_owned(
        &self,
        owner: &ObjectKey,
        dependent_kind: &str,
    ) -> Result<Vec<RawObject>, StoreError> {
        let state = self.state.lock();
        let Some(dependents) = state.owners.get(owner) else {
            return Ok(Vec::new());
        };
        Ok(dependents
            .iter()
            .filter(|key| key.kind == dependent_kind)
            .filter_map(|key| state.objects.get(key).cloned())
            .collect())
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }

    fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}
