//! Clients for target clusters.
//!
//! A target cluster is reached through a credential (a `Secret`) in the
//! control plane. [`CachedClientFactory`] reads the credential, hands it to
//! a [`Connector`] to build a client, and keeps that client until the
//! credential changes.

use crate::api::Secret;
use crate::error::ReconcileError;
use async_trait::async_trait;
use dashmap::DashMap;
use fleet_store::{ObjectKey, ObjectStore, ObjectStoreExt, Resource};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Data key holding the address a credential points at.
pub const ADDRESS_KEY: &str = "address";

#[async_trait]
pub trait RemoteClients: Send + Sync {
    /// A client for the cluster the named credential grants access to.
    async fn client(
        &self,
        namespace: &str,
        credential: &str,
    ) -> Result<Arc<dyn ObjectStore>, ReconcileError>;
}

/// Builds a client from the contents of a credential.
pub trait Connector: Send + Sync {
    fn connect(&self, credential: &Secret) -> Result<Arc<dyn ObjectStore>, ReconcileError>;
}

pub struct CachedClientFactory {
    store: Arc<dyn ObjectStore>,
    connector: Arc<dyn Connector>,
    cache: DashMap<ObjectKey, (u64, Arc<dyn ObjectStore>)>,
}

impl CachedClientFactory {
    pub fn new(store: Arc<dyn ObjectStore>, connector: Arc<dyn Connector>) -> Self {
        Self {
            store,
            connector,
            cache: DashMap::new(),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl RemoteClients for CachedClientFactory {
    async fn client(
        &self,
        namespace: &str,
        credential: &str,
    ) -> Result<Arc<dyn ObjectStore>, ReconcileError> {
        let secret = self
            .store
            .get::<Secret>(namespace, credential)
            .await?
            .ok_or_else(|| {
                ReconcileError::Unreachable(format!("credential {namespace}/{credential} not found"))
            })?;
        let key = secret.key();
        let version = secret.metadata.resource_version;

        if let Some(entry) = self.cache.get(&key)
            && entry.0 == version
        {
            return Ok(Arc::clone(&entry.1));
        }

        let client = self.connector.connect(&secret)?;
        tracing::debug!(credential = %key, version, "connected to remote cluster");
        self.cache.insert(key, (version, Arc::clone(&client)));
        Ok(client)
    }
}

/// Connects to stores registered in-process under an address.
///
/// Stands in for a network connector wherever target clusters are
/// simulated, e.g. in tests and local dry runs.
#[derive(Default)]
pub struct InMemoryConnector {
    clusters: DashMap<String, Arc<dyn ObjectStore>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, address: impl Into<String>, store: Arc<dyn ObjectStore>) {
        self.clusters.insert(address.into(), store);
    }

    /// Make the address unreachable.
    pub fn unregister(&self, address: &str) {
        self.clusters.remove(address);
    }
}

impl Connector for InMemoryConnector {
    fn connect(&self, credential: &Secret) -> Result<Arc<dyn ObjectStore>, ReconcileError> {
        let address = credential.data.get(ADDRESS_KEY).ok_or_else(|| {
            ReconcileError::Unreachable(format!(
                "credential {} has no {ADDRESS_KEY:?} entry",
                credential.metadata.name
            ))
        })?;
        self.clusters
            .get(address)
            .map(|store| Arc::clone(store.value()))
            .ok_or_else(|| ReconcileError::Unreachable(format!("no cluster at {address}")))
    }
}

/// Run a remote operation, giving up after `limit`.
pub async fn bounded<T>(
    limit: Duration,
    operation: impl Future<Output = Result<T, ReconcileError>>,
) -> Result<T, ReconcileError> {
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| ReconcileError::Timeout(limit))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_store::{MemoryStore, ObjectMeta};

    fn credential(name: &str, address: &str) -> Secret {
        let mut secret = Secret {
            metadata: ObjectMeta::named("fleet", name),
            ..Secret::default()
        };
        secret
            .data
            .insert(ADDRESS_KEY.to_string(), address.to_string());
        secret
    }

    #[tokio::test]
    async fn clients_are_cached_until_the_credential_changes() {
        let control = Arc::new(MemoryStore::new());
        let connector = Arc::new(InMemoryConnector::new());
        connector.register("a", Arc::new(MemoryStore::new()));
        connector.register("b", Arc::new(MemoryStore::new()));
        let created = control
            .create(&credential("c1-kubeconfig", "a"))
            .await
            .expect("credential");

        let factory = CachedClientFactory::new(control.clone(), connector.clone());
        let first = factory.client("fleet", "c1-kubeconfig").await.expect("client");
        let again = factory.client("fleet", "c1-kubeconfig").await.expect("client");
        assert!(Arc::ptr_eq(&first, &again));

        let mut moved = created.clone();
        moved.data.insert(ADDRESS_KEY.to_string(), "b".to_string());
        control.update(&moved).await.expect("update credential");
        let fresh = factory.client("fleet", "c1-kubeconfig").await.expect("client");
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert_eq!(factory.cached(), 1);
    }

    #[tokio::test]
    async fn missing_credentials_and_addresses_are_unreachable() {
        let control = Arc::new(MemoryStore::new());
        let connector = Arc::new(InMemoryConnector::new());
        control
            .create(&credential("c2-kubeconfig", "nowhere"))
            .await
            .expect("credential");
        let factory = CachedClientFactory::new(control, connector);

        let missing = factory.client("fleet", "c1-kubeconfig").await.err();
        assert!(matches!(missing, Some(ReconcileError::Unreachable(_))));
        let nowhere = factory.client("fleet", "c2-kubeconfig").await.err();
        assert!(matches!(nowhere, Some(ReconcileError::Unreachable(_))));
    }

    #[tokio::test]
    async fn slow_operations_time_out() {
        let limit = Duration::from_millis(10);
        let result: Result<(), _> = bounded(limit, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ReconcileError::Timeout(_))));
    }
}
