//! The object store boundary.
//!
//! [`ObjectStore`] is object safe and works on [`RawObject`]s so that a
//! remote cluster client can stand behind an `Arc<dyn ObjectStore>`.
//! [`ObjectStoreExt`] layers typed access on top for any store.

use crate::error::StoreError;
use crate::object::{ObjectKey, ObjectMeta, RawObject, Resource};
use async_trait::async_trait;
use fleet_kernel::LabelSelector;
use std::future::Future;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

/// A change to one object, as seen after the write.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent {
    pub event_type: EventType,
    pub object: RawObject,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_raw(&self, key: &ObjectKey) -> Result<Option<RawObject>, StoreError>;

    /// Objects of `kind`, optionally restricted to a namespace and to those
    /// whose labels match `selector`. Ordered by key.
    async fn list_raw(
        &self,
        kind: &str,
        namespace: Option<&str>,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<RawObject>, StoreError>;

    /// Store a new object. The store assigns uid, version and timestamp.
    async fn create_raw(&self, object: RawObject) -> Result<RawObject, StoreError>;

    /// Replace metadata and spec, keeping the stored status.
    ///
    /// `object.metadata.resource_version` must match the stored version.
    /// A write that changes nothing returns the stored object untouched.
    async fn update_raw(&self, object: RawObject) -> Result<RawObject, StoreError>;

    /// Replace only the status, under the same version check as
    /// [`ObjectStore::update_raw`].
    async fn update_status_raw(&self, object: RawObject) -> Result<RawObject, StoreError>;

    /// Delete an object and, transitively, every object it controls.
    /// Returns whether the object existed.
    async fn delete(&self, key: &ObjectKey) -> Result<bool, StoreError>;

    /// Objects of `dependent_kind` holding an owner reference to `owner`.
    async fn list_owned(
        &self,
        owner: &ObjectKey,
        dependent_kind: &str,
    ) -> Result<Vec<RawObject>, StoreError>;

    /// Subscribe to changes made after this call.
    fn watch(&self) -> broadcast::Receiver<WatchEvent>;

    /// Number of effective writes so far. No-op writes are not counted.
    fn write_count(&self) -> u64;
}

/// Typed helpers over any [`ObjectStore`].
#[async_trait]
pub trait ObjectStoreExt: ObjectStore {
    async fn get<R: Resource>(&self, namespace: &str, name: &str) -> Result<Option<R>, StoreError> {
        self.get_raw(&ObjectKey::of::<R>(namespace, name))
            .await?
            .map(RawObject::into_resource)
            .transpose()
    }

    async fn list<R: Resource>(
        &self,
        namespace: Option<&str>,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<R>, StoreError> {
        self.list_raw(R::KIND, namespace, selector)
            .await?
            .into_iter()
            .map(RawObject::into_resource)
            .collect()
    }

    async fn create<R: Resource>(&self, resource: &R) -> Result<R, StoreError> {
        let raw = RawObject::from_resource(resource)?;
        self.create_raw(raw).await?.into_resource()
    }

    async fn update<R: Resource>(&self, resource: &R) -> Result<R, StoreError> {
        let raw = RawObject::from_resource(resource)?;
        self.update_raw(raw).await?.into_resource()
    }

    async fn update_status<R: Resource>(&self, resource: &R) -> Result<R, StoreError> {
        let raw = RawObject::from_resource(resource)?;
        self.update_status_raw(raw).await?.into_resource()
    }

    async fn owned<R: Resource>(&self, owner: &ObjectKey) -> Result<Vec<R>, StoreError> {
        self.list_owned(owner, R::KIND)
            .await?
            .into_iter()
            .map(RawObject::into_resource)
            .collect()
    }
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {}

/// What [`create_or_update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    None,
    Created,
    Updated,
}

impl OperationResult {
    pub fn wrote(&self) -> bool {
        !matches!(self, OperationResult::None)
    }
}

/// Fetch the named object (or start from `R::default()`), apply `mutate`,
/// and write it back only if it changed.
///
/// If the object appears between the read and the create, the create fails
/// with [`StoreError::AlreadyExists`], which [`retry_on_conflict`] treats
/// as a conflict: the next attempt reads it and updates instead.
///
/// `mutate` sees the current stored state, so it must set every field it
/// owns rather than assume a fresh object.
pub async fn create_or_update<R, S, E, F>(
    store: &S,
    namespace: &str,
    name: &str,
    mutate: F,
) -> Result<(R, OperationResult), E>
where
    R: Resource + Default,
    S: ObjectStore + ?Sized,
    E: From<StoreError>,
    F: FnOnce(&mut R) -> Result<(), E>,
{
    match store.get::<R>(namespace, name).await? {
        None => {
            let mut fresh = R::default();
            *fresh.meta_mut() = ObjectMeta::named(namespace, name);
            mutate(&mut fresh)?;
            let created = store.create(&fresh).await?;
            tracing::debug!(kind = R::KIND, namespace, name, "created");
            Ok((created, OperationResult::Created))
        }
        Some(existing) => {
            let mut desired = existing.clone();
            mutate(&mut desired)?;
            if desired == existing {
                return Ok((existing, OperationResult::None));
            }
            let updated = store.update(&desired).await?;
            tracing::debug!(kind = R::KIND, namespace, name, "updated");
            Ok((updated, OperationResult::Updated))
        }
    }
}

/// Errors that can report a stale-write conflict.
pub trait ConflictError {
    fn is_conflict(&self) -> bool;
}

impl ConflictError for StoreError {
    /// A create that finds the object already there lost the same race as a
    /// stale update: another writer got in between the read and the write.
    fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. } | StoreError::AlreadyExists(_)
        )
    }
}

/// Run `op` until it stops failing with a conflict, at most `attempts` times.
pub async fn retry_on_conflict<T, E, F, Fut>(attempts: usize, mut op: F) -> Result<T, E>
where
    E: ConflictError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_conflict() && attempt < attempts => {
                tracing::debug!(attempt, "write conflict; retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}
