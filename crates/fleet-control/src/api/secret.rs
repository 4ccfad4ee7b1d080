use super::impl_resource;
use fleet_store::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A credential. Only its presence and contents matter here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl_resource!(Secret, "v1", "Secret");
