use super::impl_resource;
use fleet_store::ObjectMeta;
use serde::{Deserialize, Serialize};

/// A target cluster as registered in the control plane. Only its labels and
/// control-plane readiness are read: modules are not placed on a cluster
/// until its control plane reports ready.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: ClusterStatus,
}

impl_resource!(Cluster, "cluster.x-k8s.io/v1alpha4", "Cluster");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub control_plane_ready: bool,
    #[serde(default)]
    pub infrastructure_ready: bool,
}
