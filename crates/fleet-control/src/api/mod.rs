//! Object kinds the controllers read and write.
//!
//! `Module` and `Assemblage` are the fleet's own kinds; `Cluster`,
//! `GitRepository`, `PackageApplication` and `Secret` belong to neighbouring
//! systems and are modelled only as far as the controllers touch them.

mod assemblage;
mod cluster;
mod gitops;
mod module;
mod secret;

pub use assemblage::{
    Assemblage, AssemblageSpec, AssemblageStatus, AssemblageSync, KubeconfigReference,
};
pub use cluster::{Cluster, ClusterStatus};
pub use gitops::{GitRepository, PackageApplication, PackageApplicationStatus};
pub use module::{Module, ModuleSpec, ModuleStatus};
pub use secret::Secret;

pub const FLEET_API_VERSION: &str = "fleet.squaremo.dev/v1alpha1";

macro_rules! impl_resource {
    ($ty:ty, $api_version:expr, $kind:literal) => {
        impl fleet_store::Resource for $ty {
            const API_VERSION: &'static str = $api_version;
            const KIND: &'static str = $kind;

            fn meta(&self) -> &fleet_store::ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut fleet_store::ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

pub(crate) use impl_resource;
