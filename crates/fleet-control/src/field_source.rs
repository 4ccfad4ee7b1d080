//! Object-field lookups against a store, scoped to one namespace.

use async_trait::async_trait;
use fleet_kernel::{FieldSource, LookupError};
use fleet_store::{ObjectKey, ObjectStore};
use serde_json::Value;

pub struct StoreFieldSource<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    namespace: &'a str,
}

impl<'a, S: ObjectStore + ?Sized> StoreFieldSource<'a, S> {
    pub fn new(store: &'a S, namespace: &'a str) -> Self {
        Self { store, namespace }
    }
}

#[async_trait]
impl<S: ObjectStore + ?Sized> FieldSource for StoreFieldSource<'_, S> {
    async fn lookup(
        &self,
        api_version: &str,
        kind: &str,
        name: &str,
    ) -> Result<Option<Value>, LookupError> {
        let key = ObjectKey::new(kind, self.namespace, name);
        let Some(object) = self.store.get_raw(&key).await.map_err(LookupError::backend)? else {
            return Ok(None);
        };
        if !api_version.is_empty() && object.api_version != api_version {
            return Ok(None);
        }
        object.to_value().map(Some).map_err(LookupError::backend)
    }
}
