use super::{FLEET_API_VERSION, impl_resource};
use fleet_kernel::{Binding, PackageSpec, SourceReference, SyncState, SyncStatus};
use fleet_store::ObjectMeta;
use serde::{Deserialize, Serialize};

/// The syncs one cluster should be running, one entry per contributing
/// module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assemblage {
    pub metadata: ObjectMeta,
    pub spec: AssemblageSpec,
    #[serde(default)]
    pub status: AssemblageStatus,
}

impl_resource!(Assemblage, FLEET_API_VERSION, "Assemblage");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblageSpec {
    /// Credential for reaching the target cluster. Absent on the copy that
    /// lives inside the target cluster itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig_ref: Option<KubeconfigReference>,
    #[serde(default)]
    pub syncs: Vec<AssemblageSync>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubeconfigReference {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblageSync {
    /// Name of the contributing module.
    pub name: String,
    /// Control-plane bindings already evaluated for this cluster.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub control_plane_bindings: Vec<Binding>,
    /// Target-cluster bindings, not yet evaluated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
    pub source_ref: SourceReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssemblageStatus {
    #[serde(default)]
    pub syncs: Vec<SyncStatus>,
}

impl Assemblage {
    /// Whether this assemblage is compiled inside the cluster it targets.
    pub fn is_local(&self) -> bool {
        self.spec.kubeconfig_ref.is_none()
    }

    /// The reported state of the named entry, if any has been reported.
    pub fn sync_state(&self, name: &str) -> Option<SyncState> {
        self.status
            .syncs
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.state)
    }

    pub fn entry(&self, name: &str) -> Option<&AssemblageSync> {
        self.spec.syncs.iter().find(|s| s.name == name)
    }

    /// Replace the named entry in place, or append it.
    pub fn upsert_entry(&mut self, entry: AssemblageSync) {
        match self.spec.syncs.iter_mut().find(|s| s.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.spec.syncs.push(entry),
        }
    }

    /// Remove the named entry. Returns whether it was there.
    pub fn remove_entry(&mut self, name: &str) -> bool {
        let before = self.spec.syncs.len();
        self.spec.syncs.retain(|s| s.name != name);
        before != self.spec.syncs.len()
    }
}
