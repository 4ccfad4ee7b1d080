//! Fixtures shared by the controller integration tests.

#![allow(dead_code)]

use fleet_control::api::{Cluster, ClusterStatus, Module, ModuleSpec, ModuleStatus, PackageApplication, Secret};
use fleet_control::{ADDRESS_KEY, ControllerConfig};
use fleet_kernel::sync::Sync as SyncSpec;
use fleet_kernel::{
    Binding, GitSource, GitVersion, LabelSelector, PackageSpec, READY_CONDITION, ReadyCondition,
    SourceSpec,
};
use fleet_store::{MemoryStore, ObjectMeta, ObjectStore, ObjectStoreExt, Resource};
use std::collections::BTreeMap;

pub const NS: &str = "fleet";

pub fn config() -> ControllerConfig {
    ControllerConfig {
        max_requeues: 2,
        remote_timeout_ms: 1_000,
        ..ControllerConfig::default()
    }
}

pub fn everything() -> Option<LabelSelector> {
    Some(LabelSelector::default())
}

pub fn env_selector(env: &str) -> Option<LabelSelector> {
    let mut selector = LabelSelector::default();
    selector
        .match_labels
        .insert("env".to_string(), env.to_string());
    Some(selector)
}

pub fn module(name: &str, selector: Option<LabelSelector>) -> Module {
    Module {
        metadata: ObjectMeta::named(NS, name),
        spec: ModuleSpec {
            selector,
            control_plane_bindings: Vec::new(),
            sync: SyncSpec {
                source: SourceSpec {
                    git: GitSource {
                        url: format!("https://github.com/example/{name}"),
                        version: GitVersion::tag("v6.0.0"),
                    },
                },
                bindings: Vec::new(),
                package: Some(PackageSpec {
                    path: "./kustomize".to_string(),
                    substitute: BTreeMap::new(),
                }),
            },
        },
        status: ModuleStatus::default(),
    }
}

pub fn substituting(mut module: Module, key: &str, template: &str) -> Module {
    if let Some(package) = module.spec.sync.package.as_mut() {
        package
            .substitute
            .insert(key.to_string(), template.to_string());
    }
    module
}

pub fn with_control_plane_binding(mut module: Module, name: &str, value: &str) -> Module {
    module
        .spec
        .control_plane_bindings
        .push(Binding::literal(name, value));
    module
}

/// A cluster whose control plane is up.
pub fn cluster(name: &str, env: &str) -> Cluster {
    let mut cluster = Cluster {
        metadata: ObjectMeta::named(NS, name),
        status: ClusterStatus {
            control_plane_ready: true,
            infrastructure_ready: true,
        },
    };
    cluster
        .metadata
        .labels
        .insert("env".to_string(), env.to_string());
    cluster
}

pub fn credential(cluster: &str, address: &str) -> Secret {
    let mut secret = Secret {
        metadata: ObjectMeta::named(NS, format!("{cluster}-kubeconfig")),
        ..Secret::default()
    };
    secret
        .data
        .insert(ADDRESS_KEY.to_string(), address.to_string());
    secret
}

pub fn ready(status: &str, reason: &str) -> ReadyCondition {
    ReadyCondition {
        type_: READY_CONDITION.to_string(),
        status: status.to_string(),
        reason: reason.to_string(),
        message: String::new(),
    }
}

/// Report the named package application as ready, the way the applying
/// controller would.
pub async fn mark_ready(store: &MemoryStore, name: &str) {
    let mut app: PackageApplication = store
        .get(NS, name)
        .await
        .expect("get application")
        .unwrap_or_else(|| panic!("application {name} should exist"));
    app.status.conditions = vec![ready("True", "ReconciliationSucceeded")];
    store.update_status(&app).await.expect("update status");
}

pub async fn names<R: Resource>(store: &MemoryStore) -> Vec<String> {
    store
        .list::<R>(Some(NS), None)
        .await
        .expect("list")
        .into_iter()
        .map(|r| r.meta().name.clone())
        .collect()
}

/// Register a cluster together with its credential.
pub async fn add_cluster<S: ObjectStore + ?Sized>(store: &S, name: &str, env: &str) {
    store.create(&cluster(name, env)).await.expect("cluster");
    store
        .create(&credential(name, name))
        .await
        .expect("credential");
}
