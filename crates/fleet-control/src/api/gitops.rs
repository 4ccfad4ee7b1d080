use super::impl_resource;
use fleet_kernel::source::{GIT_REPOSITORY_API_VERSION, GIT_REPOSITORY_KIND};
use fleet_kernel::{GitRepositorySpec, PackageApplicationSpec, ReadyCondition, SyncState, ready_state};
use fleet_store::{ObjectMeta, Resource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitRepository {
    pub metadata: ObjectMeta,
    pub spec: GitRepositorySpec,
    /// Owned by the source controller; carried but never interpreted.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub status: serde_json::Value,
}

impl_resource!(GitRepository, GIT_REPOSITORY_API_VERSION, "GitRepository");

impl GitRepository {
    pub fn source_ref(&self) -> fleet_kernel::SourceReference {
        fleet_kernel::SourceReference {
            api_version: Self::API_VERSION.to_string(),
            kind: GIT_REPOSITORY_KIND.to_string(),
            name: self.metadata.name.clone(),
        }
    }
}

/// Applies the package at a source to a cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageApplication {
    pub metadata: ObjectMeta,
    pub spec: PackageApplicationSpec,
    #[serde(default)]
    pub status: PackageApplicationStatus,
}

impl_resource!(
    PackageApplication,
    "kustomize.toolkit.fluxcd.io/v1beta1",
    "Kustomization"
);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageApplicationStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ReadyCondition>,
}

impl PackageApplication {
    /// Name for the application of `sync` to `cluster`.
    pub fn name_for(sync: &str, cluster: &str) -> String {
        format!("{sync}-{cluster}")
    }

    pub fn state(&self) -> SyncState {
        ready_state(&self.status.conditions)
    }
}
