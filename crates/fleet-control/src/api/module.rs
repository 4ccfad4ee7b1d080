use super::{FLEET_API_VERSION, impl_resource};
use fleet_kernel::sync::Sync as SyncSpec;
use fleet_kernel::{Binding, LabelSelector, SyncSummary};
use fleet_store::ObjectMeta;
use serde::{Deserialize, Serialize};

/// A sync to be rolled out to every cluster the selector picks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub metadata: ObjectMeta,
    pub spec: ModuleSpec,
    #[serde(default)]
    pub status: ModuleStatus,
}

impl_resource!(Module, FLEET_API_VERSION, "Module");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    /// Absent selects no clusters; empty selects all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
    /// Evaluated in the control plane, once per selected cluster.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub control_plane_bindings: Vec<Binding>,
    /// `sync.bindings` are evaluated in the target cluster.
    pub sync: SyncSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_sync: Option<SyncSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SyncSummary>,
}
