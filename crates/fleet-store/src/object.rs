//! Object identity, metadata and the typed/raw object forms.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Identifies an object: kind, namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(kind: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a typed resource.
    pub fn of<R: Resource>(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(R::KIND, namespace, name)
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Points from a dependent to an object in the same namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    /// At most one owner reference on an object is the controller.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub controller: bool,
}

impl OwnerReference {
    /// A reference to `owner`, controlling or not.
    pub fn to<R: Resource>(owner: &R, controller: bool) -> Self {
        Self {
            api_version: R::API_VERSION.to_string(),
            kind: R::KIND.to_string(),
            name: owner.meta().name.clone(),
            uid: owner.meta().uid.clone(),
            controller,
        }
    }

    pub fn refers_to(&self, kind: &str, name: &str) -> bool {
        self.kind == kind && self.name == name
    }

    /// Adopt `uid` if it is set and differs. Returns whether it changed.
    fn refresh_uid(&mut self, uid: &str) -> bool {
        if uid.is_empty() || self.uid == uid {
            return false;
        }
        self.uid = uid.to_string();
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    /// Assigned by the store on create.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// Bumped by the store on every effective write; zero before create.
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// The controlling owner reference, if any.
    pub fn controller(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.controller)
    }

    pub fn is_owned_by(&self, kind: &str, name: &str) -> bool {
        self.owner_references.iter().any(|r| r.refers_to(kind, name))
    }

    /// Add `owner` unless a reference to the same kind and name is already
    /// present. A present reference takes `owner`'s uid, so an owner
    /// recreated under the same name is recognised by garbage collection.
    ///
    /// Returns whether the list changed.
    pub fn add_owner(&mut self, owner: OwnerReference) -> bool {
        match self
            .owner_references
            .iter_mut()
            .find(|r| r.refers_to(&owner.kind, &owner.name))
        {
            Some(existing) => existing.refresh_uid(&owner.uid),
            None => {
                self.owner_references.push(owner);
                true
            }
        }
    }

    /// Set the controller reference when there is none yet.
    ///
    /// An existing controller is never replaced, though its uid is refreshed
    /// when it names the same object; returns whether `owner` is (now) the
    /// controller.
    pub fn set_controller(&mut self, mut owner: OwnerReference) -> bool {
        if let Some(existing) = self.owner_references.iter_mut().find(|r| r.controller) {
            if !existing.refers_to(&owner.kind, &owner.name) {
                return false;
            }
            existing.refresh_uid(&owner.uid);
            return true;
        }
        owner.controller = true;
        self.owner_references
            .retain(|r| !r.refers_to(&owner.kind, &owner.name));
        self.owner_references.push(owner);
        true
    }

    /// Drop any reference to the named owner. Returns whether one was removed.
    pub fn remove_owner(&mut self, kind: &str, name: &str) -> bool {
        let before = self.owner_references.len();
        self.owner_references.retain(|r| !r.refers_to(kind, name));
        before != self.owner_references.len()
    }
}

/// A typed object kind.
///
/// Typed objects serialize as `{metadata, ...}`; the store adds `apiVersion`
/// and `kind` when converting to a [`RawObject`].
pub trait Resource:
    Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static
{
    const API_VERSION: &'static str;
    const KIND: &'static str;

    fn meta(&self) -> &ObjectMeta;
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        ObjectKey::new(Self::KIND, &self.meta().namespace, &self.meta().name)
    }
}

/// The untyped form the store holds: metadata plus the remaining top-level
/// fields (`spec`, `status`, `data`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

pub(crate) const STATUS_FIELD: &str = "status";

impl RawObject {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.kind, &self.metadata.namespace, &self.metadata.name)
    }

    pub fn from_resource<R: Resource>(resource: &R) -> Result<Self, StoreError> {
        let mut value = serde_json::to_value(resource)?;
        if let Value::Object(map) = &mut value {
            map.insert("apiVersion".to_string(), Value::from(R::API_VERSION));
            map.insert("kind".to_string(), Value::from(R::KIND));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn into_resource<R: Resource>(self) -> Result<R, StoreError> {
        if self.kind != R::KIND {
            return Err(StoreError::Serialization(format!(
                "expected kind {}, found {}",
                R::KIND,
                self.kind
            )));
        }
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }

    /// The whole object as JSON, as object-field bindings see it.
    pub fn to_value(&self) -> Result<Value, StoreError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn status(&self) -> Option<&Value> {
        self.body.get(STATUS_FIELD)
    }

    /// Everything but the status, for comparing desired state.
    pub(crate) fn without_status(&self) -> Map<String, Value> {
        let mut body = self.body.clone();
        body.remove(STATUS_FIELD);
        body
    }
}
