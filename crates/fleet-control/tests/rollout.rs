//! Direct delivery end to end: modules fan out to assemblages, assemblages
//! compile to package applications, and status flows back up.

mod common;

use async_trait::async_trait;
use common::*;
use fleet_control::api::{Assemblage, Cluster, GitRepository, Module, PackageApplication};
use fleet_control::{Manager, ReconcileError};
use fleet_kernel::{
    Binding, GitVersion, LabelSelector, ObjectFieldSelector, SyncState, SyncSummary,
};
use fleet_store::{
    EventType, MemoryStore, ObjectKey, ObjectStore, ObjectStoreExt, RawObject, Resource,
    StoreError, WatchEvent,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

async fn settle(store: &Arc<MemoryStore>) -> fleet_control::SettleReport {
    Manager::new(store.clone(), config())
        .run_until_settled()
        .await
        .expect("settle")
}

async fn module_summary(store: &MemoryStore, name: &str) -> Option<SyncSummary> {
    let module: Module = store
        .get(NS, name)
        .await
        .expect("get module")
        .expect("module exists");
    module.status.summary
}

#[tokio::test]
async fn empty_selector_reaches_every_cluster_and_absent_selector_none() {
    let store = Arc::new(MemoryStore::new());
    for name in ["c1", "c2", "c3"] {
        add_cluster(store.as_ref(), name, "prod").await;
    }
    let created = store
        .create(&module("podinfo", everything()))
        .await
        .expect("module");

    let report = settle(&store).await;
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert_eq!(names::<Assemblage>(&store).await, vec!["c1", "c2", "c3"]);
    assert_eq!(
        names::<PackageApplication>(&store).await,
        vec!["podinfo-c1", "podinfo-c2", "podinfo-c3"]
    );
    assert_eq!(names::<GitRepository>(&store).await, vec!["podinfo"]);
    assert_eq!(
        module_summary(&store, "podinfo").await,
        Some(SyncSummary {
            total: 3,
            updating: 3,
            ..SyncSummary::default()
        })
    );

    let mut unselected = store
        .get::<Module>(NS, "podinfo")
        .await
        .expect("get")
        .unwrap_or(created);
    unselected.spec.selector = None;
    store.update(&unselected).await.expect("update module");

    settle(&store).await;
    for asm in store.list::<Assemblage>(Some(NS), None).await.expect("list") {
        assert!(asm.spec.syncs.is_empty(), "{} still has entries", asm.metadata.name);
        assert!(!asm.metadata.is_owned_by(Module::KIND, "podinfo"));
    }
    assert!(names::<PackageApplication>(&store).await.is_empty());
    assert_eq!(
        module_summary(&store, "podinfo").await,
        Some(SyncSummary::default())
    );
}

#[tokio::test]
async fn label_selector_picks_matching_clusters() {
    let store = Arc::new(MemoryStore::new());
    add_cluster(store.as_ref(), "eu-1", "prod").await;
    add_cluster(store.as_ref(), "eu-2", "staging").await;
    store
        .create(&module("podinfo", env_selector("prod")))
        .await
        .expect("module");

    settle(&store).await;
    assert_eq!(names::<Assemblage>(&store).await, vec!["eu-1"]);

    // Relabelling a cluster brings it into scope.
    let mut relabelled: Cluster = store.get(NS, "eu-2").await.expect("get").expect("cluster");
    relabelled
        .metadata
        .labels
        .insert("env".to_string(), "prod".to_string());
    store.update(&relabelled).await.expect("relabel");

    settle(&store).await;
    assert_eq!(names::<Assemblage>(&store).await, vec!["eu-1", "eu-2"]);

    // Relabelling one out of scope reaches the module through the
    // assemblage it was placed in, and withdraws the entry.
    let mut moved: Cluster = store.get(NS, "eu-1").await.expect("get").expect("cluster");
    moved
        .metadata
        .labels
        .insert("env".to_string(), "staging".to_string());
    let moved = store.update(&moved).await.expect("relabel");
    let manager = Manager::new(store.clone(), config());
    let event = WatchEvent {
        event_type: EventType::Modified,
        object: RawObject::from_resource(&moved).expect("raw"),
    };
    assert_eq!(
        manager.dependents(&event).await.expect("route"),
        vec![ObjectKey::of::<Module>(NS, "podinfo")]
    );

    manager.run_until_settled().await.expect("settle");
    let left: Assemblage = store.get(NS, "eu-1").await.expect("get").expect("assemblage");
    assert!(left.entry("podinfo").is_none());
    assert!(!left.metadata.is_owned_by(Module::KIND, "podinfo"));
    assert_eq!(names::<PackageApplication>(&store).await, vec!["podinfo-eu-2"]);
}

#[tokio::test]
async fn modules_wait_for_the_cluster_control_plane() {
    let store = Arc::new(MemoryStore::new());
    let mut booting = cluster("c1", "prod");
    booting.status.control_plane_ready = false;
    store.create(&booting).await.expect("cluster");
    store
        .create(&credential("c1", "c1"))
        .await
        .expect("credential");
    store
        .create(&module("podinfo", everything()))
        .await
        .expect("module");

    let report = settle(&store).await;
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert!(names::<Assemblage>(&store).await.is_empty());
    assert_eq!(
        module_summary(&store, "podinfo").await,
        Some(SyncSummary::default())
    );

    let mut up: Cluster = store.get(NS, "c1").await.expect("get").expect("cluster");
    up.status.control_plane_ready = true;
    store.update_status(&up).await.expect("ready");
    settle(&store).await;
    assert_eq!(names::<PackageApplication>(&store).await, vec!["podinfo-c1"]);
    assert_eq!(
        module_summary(&store, "podinfo").await.map(|s| s.total),
        Some(1)
    );

    // Going unready again leaves what is already there in place.
    let mut down: Cluster = store.get(NS, "c1").await.expect("get").expect("cluster");
    down.status.control_plane_ready = false;
    store.update_status(&down).await.expect("unready");
    settle(&store).await;
    let asm: Assemblage = store.get(NS, "c1").await.expect("get").expect("assemblage");
    assert!(asm.entry("podinfo").is_some());
    assert_eq!(names::<PackageApplication>(&store).await, vec!["podinfo-c1"]);
}

#[tokio::test]
async fn a_second_pass_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    add_cluster(store.as_ref(), "c1", "prod").await;
    add_cluster(store.as_ref(), "c2", "prod").await;
    store
        .create(&substituting(
            module("podinfo", everything()),
            "cluster",
            "$(CLUSTER_NAME)",
        ))
        .await
        .expect("module");

    settle(&store).await;
    let writes = store.write_count();

    let report = settle(&store).await;
    assert!(report.reconciled > 0);
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn ready_applications_count_as_succeeded() {
    let store = Arc::new(MemoryStore::new());
    add_cluster(store.as_ref(), "c1", "prod").await;
    store
        .create(&module("podinfo", everything()))
        .await
        .expect("module");

    settle(&store).await;
    let asm: Assemblage = store.get(NS, "c1").await.expect("get").expect("assemblage");
    assert_eq!(asm.sync_state("podinfo"), Some(SyncState::Updating));

    mark_ready(&store, "podinfo-c1").await;
    settle(&store).await;

    let asm: Assemblage = store.get(NS, "c1").await.expect("get").expect("assemblage");
    assert_eq!(asm.sync_state("podinfo"), Some(SyncState::Succeeded));
    assert_eq!(
        module_summary(&store, "podinfo").await,
        Some(SyncSummary {
            total: 1,
            succeeded: 1,
            ..SyncSummary::default()
        })
    );
}

#[tokio::test]
async fn failed_reconciliation_is_reported_as_failed() {
    let store = Arc::new(MemoryStore::new());
    add_cluster(store.as_ref(), "c1", "prod").await;
    store
        .create(&module("podinfo", everything()))
        .await
        .expect("module");
    settle(&store).await;

    let mut app: PackageApplication = store
        .get(NS, "podinfo-c1")
        .await
        .expect("get")
        .expect("application");
    app.status.conditions = vec![ready("False", "ReconciliationFailed")];
    store.update_status(&app).await.expect("status");
    settle(&store).await;

    let summary = module_summary(&store, "podinfo").await.expect("summary");
    assert_eq!((summary.total, summary.failed), (1, 1));
}

#[tokio::test]
async fn control_plane_bindings_are_evaluated_and_target_bindings_deferred() {
    let store = Arc::new(MemoryStore::new());
    add_cluster(store.as_ref(), "c1", "prod").await;

    let mut podinfo = with_control_plane_binding(
        module("podinfo", everything()),
        "REGION",
        "eu-$(CLUSTER_NAME)",
    );
    podinfo.spec.sync.bindings.push(Binding::object_field(
        "TARGET",
        ObjectFieldSelector {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            name: "cluster-info".to_string(),
            field_path: "/data/target".to_string(),
        },
    ));
    let podinfo = substituting(podinfo, "region", "$(REGION)");
    let podinfo = substituting(podinfo, "target", "$(TARGET)");
    store.create(&podinfo).await.expect("module");

    settle(&store).await;

    let asm: Assemblage = store.get(NS, "c1").await.expect("get").expect("assemblage");
    let entry = asm.entry("podinfo").expect("entry");
    assert_eq!(
        entry.control_plane_bindings,
        vec![Binding::literal("REGION", "eu-c1")]
    );
    assert_eq!(entry.bindings, podinfo.spec.sync.bindings);
    assert_eq!(
        asm.spec.kubeconfig_ref.as_ref().map(|k| k.name.as_str()),
        Some("c1-kubeconfig")
    );

    let app: PackageApplication = store
        .get(NS, "podinfo-c1")
        .await
        .expect("get")
        .expect("application");
    insta::assert_json_snapshot!(app.spec.substitute, @r###"
    {
      "region": "eu-c1",
      "target": "$(TARGET)"
    }
    "###);
    assert_eq!(app.spec.kubeconfig_ref.as_deref(), Some("c1-kubeconfig"));
    assert_eq!(app.spec.source_ref.name, "podinfo");
    assert!(app.metadata.controller().is_some_and(|c| c.refers_to(Assemblage::KIND, "c1")));
}

#[tokio::test]
async fn tag_and_revision_together_is_a_configuration_error() {
    let store = Arc::new(MemoryStore::new());
    add_cluster(store.as_ref(), "c1", "prod").await;
    let mut ambiguous = module("podinfo", everything());
    ambiguous.spec.sync.source.git.version = GitVersion {
        tag: "v6.0.0".to_string(),
        revision: "8f3a2c1".to_string(),
    };
    store.create(&ambiguous).await.expect("module");

    let manager = Manager::new(store.clone(), config());
    let result = manager
        .reconcile(&ObjectKey::of::<Module>(NS, "podinfo"))
        .await;
    assert!(matches!(result, Err(ReconcileError::Config(_))));
    assert!(!result.is_err_and(|e| e.is_retryable()));

    let report = manager.run_until_settled().await.expect("settle");
    assert!(report.failed.contains_key(&ObjectKey::of::<Module>(NS, "podinfo")));
    assert!(names::<GitRepository>(&store).await.is_empty());
    assert!(names::<Assemblage>(&store).await.is_empty());
}

#[tokio::test]
async fn revision_pins_the_source_commit() {
    let store = Arc::new(MemoryStore::new());
    let mut pinned = module("podinfo", everything());
    pinned.spec.sync.source.git.version = GitVersion::revision("8f3a2c1");
    store.create(&pinned).await.expect("module");

    settle(&store).await;
    let source: GitRepository = store.get(NS, "podinfo").await.expect("get").expect("source");
    assert_eq!(source.spec.reference.commit, "8f3a2c1");
    assert!(source.spec.reference.tag.is_empty());
    assert_eq!(source.spec.url, "https://github.com/example/podinfo");
    assert!(source.metadata.controller().is_some_and(|c| c.refers_to(Module::KIND, "podinfo")));
}

#[tokio::test]
async fn deleting_a_cluster_collects_everything_placed_on_it() {
    let store = Arc::new(MemoryStore::new());
    add_cluster(store.as_ref(), "c1", "prod").await;
    add_cluster(store.as_ref(), "c2", "prod").await;
    store
        .create(&module("podinfo", everything()))
        .await
        .expect("module");
    settle(&store).await;

    assert!(store
        .delete(&ObjectKey::of::<Cluster>(NS, "c2"))
        .await
        .expect("delete"));
    settle(&store).await;

    assert_eq!(names::<Assemblage>(&store).await, vec!["c1"]);
    assert_eq!(names::<PackageApplication>(&store).await, vec!["podinfo-c1"]);
    assert_eq!(
        module_summary(&store, "podinfo").await.map(|s| s.total),
        Some(1)
    );
}

#[tokio::test]
async fn deleting_a_module_withdraws_it_everywhere() {
    let store = Arc::new(MemoryStore::new());
    add_cluster(store.as_ref(), "c1", "prod").await;
    store.create(&module("podinfo", everything())).await.expect("module");
    store.create(&module("nginx", everything())).await.expect("module");
    settle(&store).await;
    assert_eq!(
        names::<PackageApplication>(&store).await,
        vec!["nginx-c1", "podinfo-c1"]
    );

    store
        .delete(&ObjectKey::of::<Module>(NS, "podinfo"))
        .await
        .expect("delete");
    settle(&store).await;

    let asm: Assemblage = store.get(NS, "c1").await.expect("get").expect("assemblage");
    let entries: Vec<&str> = asm.spec.syncs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(entries, vec!["nginx"]);
    assert!(!asm.metadata.is_owned_by(Module::KIND, "podinfo"));
    assert_eq!(names::<PackageApplication>(&store).await, vec!["nginx-c1"]);
    assert_eq!(names::<GitRepository>(&store).await, vec!["nginx"]);
}

#[tokio::test]
async fn applications_nothing_produces_are_pruned() {
    let store = Arc::new(MemoryStore::new());
    add_cluster(store.as_ref(), "c1", "prod").await;
    store
        .create(&module("podinfo", everything()))
        .await
        .expect("module");
    settle(&store).await;

    // An application left behind under the assemblage's control.
    let asm: Assemblage = store.get(NS, "c1").await.expect("get").expect("assemblage");
    let mut stale = PackageApplication {
        metadata: fleet_store::ObjectMeta::named(NS, "retired-c1"),
        ..PackageApplication::default()
    };
    stale
        .metadata
        .set_controller(fleet_store::OwnerReference::to(&asm, true));
    store.create(&stale).await.expect("stale application");
    // An unrelated application is left alone.
    store
        .create(&PackageApplication {
            metadata: fleet_store::ObjectMeta::named(NS, "hand-made"),
            ..PackageApplication::default()
        })
        .await
        .expect("unrelated application");

    settle(&store).await;
    assert_eq!(
        names::<PackageApplication>(&store).await,
        vec!["hand-made", "podinfo-c1"]
    );
}

#[tokio::test]
async fn compilation_waits_for_the_cluster_credential() {
    let store = Arc::new(MemoryStore::new());
    store.create(&cluster("c1", "prod")).await.expect("cluster");
    store
        .create(&module("podinfo", everything()))
        .await
        .expect("module");

    let manager = Manager::new(store.clone(), config());
    let report = manager.run_until_settled().await.expect("settle");
    assert!(report.failed.is_empty());
    assert_eq!(names::<Assemblage>(&store).await, vec!["c1"]);
    assert!(names::<PackageApplication>(&store).await.is_empty());

    // The credential showing up is routed to the assemblage that names it.
    let secret = credential("c1", "c1");
    let event = WatchEvent {
        event_type: EventType::Added,
        object: RawObject::from_resource(&secret).expect("raw"),
    };
    assert_eq!(
        manager.dependents(&event).await.expect("route"),
        vec![ObjectKey::of::<Assemblage>(NS, "c1")]
    );

    store.create(&secret).await.expect("credential");
    manager.run_until_settled().await.expect("settle");
    assert_eq!(names::<PackageApplication>(&store).await, vec!["podinfo-c1"]);
}

/// Refuses writes to one cluster's assemblage.
struct Unwritable {
    inner: MemoryStore,
    assemblage: &'static str,
}

impl Unwritable {
    fn check(&self, object: &RawObject) -> Result<(), StoreError> {
        if object.kind == Assemblage::KIND && object.metadata.name == self.assemblage {
            return Err(StoreError::Unavailable(format!(
                "writes to {} are refused",
                object.key()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for Unwritable {
    async fn get_raw(&self, key: &ObjectKey) -> Result<Option<RawObject>, StoreError> {
        self.inner.get_raw(key).await
    }

    async fn list_raw(
        &self,
        kind: &str,
        namespace: Option<&str>,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<RawObject>, StoreError> {
        self.inner.list_raw(kind, namespace, selector).await
    }

    async fn create_raw(&self, object: RawObject) -> Result<RawObject, StoreError> {
        self.check(&object)?;
        self.inner.create_raw(object).await
    }

    async fn update_raw(&self, object: RawObject) -> Result<RawObject, StoreError> {
        self.check(&object)?;
        self.inner.update_raw(object).await
    }

    async fn update_status_raw(&self, object: RawObject) -> Result<RawObject, StoreError> {
        self.inner.update_status_raw(object).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }

    async fn list_owned(
        &self,
        owner: &ObjectKey,
        dependent_kind: &str,
    ) -> Result<Vec<RawObject>, StoreError> {
        self.inner.list_owned(owner, dependent_kind).await
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.inner.watch()
    }

    fn write_count(&self) -> u64 {
        self.inner.write_count()
    }
}

#[tokio::test]
async fn one_failing_cluster_does_not_hold_back_the_others() {
    let store = Arc::new(Unwritable {
        inner: MemoryStore::new(),
        assemblage: "c2",
    });
    for name in ["c1", "c2", "c3"] {
        add_cluster(store.as_ref(), name, "prod").await;
    }
    store
        .create(&module("podinfo", everything()))
        .await
        .expect("module");

    let manager = Manager::new(store.clone(), config());
    let result = manager
        .reconcile(&ObjectKey::of::<Module>(NS, "podinfo"))
        .await;
    assert!(matches!(
        result,
        Err(ReconcileError::Partial { failed: 1, total: 3 })
    ));

    let report = manager.run_until_settled().await.expect("settle");
    assert_eq!(
        report.failed.keys().collect::<Vec<_>>(),
        vec![&ObjectKey::of::<Module>(NS, "podinfo")]
    );

    let placed: Vec<String> = store
        .list::<Assemblage>(Some(NS), None)
        .await
        .expect("list")
        .into_iter()
        .map(|a| a.metadata.name)
        .collect();
    assert_eq!(placed, vec!["c1", "c3"]);

    let module: Module = store.get(NS, "podinfo").await.expect("get").expect("module");
    assert_eq!(
        module.status.summary,
        Some(SyncSummary {
            total: 3,
            updating: 2,
            succeeded: 0,
            failed: 1,
        })
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    List,
    Create,
}

/// Lets one rival write in just before the first `call` on objects of
/// `kind`, the way a concurrent writer would.
struct Racing {
    inner: MemoryStore,
    call: Call,
    kind: &'static str,
    rival: Mutex<Option<RawObject>>,
}

impl Racing {
    fn before(call: Call, kind: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            call,
            kind,
            rival: Mutex::new(None),
        }
    }

    fn arm<R: Resource>(&self, rival: &R) {
        *self.rival.lock() = Some(RawObject::from_resource(rival).expect("raw"));
    }

    async fn interleave(&self, call: Call, kind: &str) -> Result<(), StoreError> {
        if call != self.call || kind != self.kind {
            return Ok(());
        }
        let rival = self.rival.lock().take();
        let Some(mut rival) = rival else {
            return Ok(());
        };
        match self.inner.get_raw(&rival.key()).await? {
            Some(stored) => {
                rival.metadata.resource_version = stored.metadata.resource_version;
                self.inner.update_raw(rival).await?;
            }
            None => {
                self.inner.create_raw(rival).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for Racing {
    async fn get_raw(&self, key: &ObjectKey) -> Result<Option<RawObject>, StoreError> {
        self.inner.get_raw(key).await
    }

    async fn list_raw(
        &self,
        kind: &str,
        namespace: Option<&str>,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<RawObject>, StoreError> {
        self.interleave(Call::List, kind).await?;
        self.inner.list_raw(kind, namespace, selector).await
    }

    async fn create_raw(&self, object: RawObject) -> Result<RawObject, StoreError> {
        self.interleave(Call::Create, &object.kind).await?;
        self.inner.create_raw(object).await
    }

    async fn update_raw(&self, object: RawObject) -> Result<RawObject, StoreError> {
        self.inner.update_raw(object).await
    }

    async fn update_status_raw(&self, object: RawObject) -> Result<RawObject, StoreError> {
        self.inner.update_status_raw(object).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }

    async fn list_owned(
        &self,
        owner: &ObjectKey,
        dependent_kind: &str,
    ) -> Result<Vec<RawObject>, StoreError> {
        self.inner.list_owned(owner, dependent_kind).await
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.inner.watch()
    }

    fn write_count(&self) -> u64 {
        self.inner.write_count()
    }
}

#[tokio::test]
async fn a_summary_is_never_written_over_a_newer_spec() {
    let store = Arc::new(Racing::before(Call::List, Cluster::KIND));
    add_cluster(store.as_ref(), "c1", "prod").await;
    let created = store
        .create(&module("podinfo", everything()))
        .await
        .expect("module");
    // The module is edited while its clusters are being looked up.
    let mut edited = created.clone();
    edited.spec.sync.source.git.version = GitVersion::tag("v7.0.0");
    store.arm(&edited);

    let manager = Manager::new(store.clone(), config());
    let result = manager
        .reconcile(&ObjectKey::of::<Module>(NS, "podinfo"))
        .await;
    assert!(
        matches!(result, Err(ReconcileError::Superseded(_))),
        "{result:?}"
    );
    assert!(result.is_err_and(|e| e.is_retryable()));
    let module: Module = store.get(NS, "podinfo").await.expect("get").expect("module");
    assert_eq!(module.status.observed_sync, None);

    let report = manager.run_until_settled().await.expect("settle");
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    let module: Module = store.get(NS, "podinfo").await.expect("get").expect("module");
    let observed = module.status.observed_sync.expect("observed sync");
    assert_eq!(observed.source.git.version.tag, "v7.0.0");
    let source: GitRepository = store.get(NS, "podinfo").await.expect("get").expect("source");
    assert_eq!(source.spec.reference.tag, "v7.0.0");
}

#[tokio::test]
async fn an_assemblage_created_underneath_a_placement_is_updated_instead() {
    let store = Arc::new(Racing::before(Call::Create, Assemblage::KIND));
    add_cluster(store.as_ref(), "c1", "prod").await;
    store
        .create(&module("podinfo", everything()))
        .await
        .expect("module");
    // Another writer creates the cluster's assemblage after podinfo's
    // placement found none.
    let mut theirs = Assemblage {
        metadata: fleet_store::ObjectMeta::named(NS, "c1"),
        ..Assemblage::default()
    };
    theirs
        .metadata
        .labels
        .insert("placed-by".to_string(), "nginx".to_string());
    store.arm(&theirs);

    let manager = Manager::new(store.clone(), config());
    manager
        .reconcile(&ObjectKey::of::<Module>(NS, "podinfo"))
        .await
        .expect("the lost create is retried as an update");

    let asm: Assemblage = store.get(NS, "c1").await.expect("get").expect("assemblage");
    assert!(asm.entry("podinfo").is_some());
    assert_eq!(
        asm.metadata.labels.get("placed-by").map(String::as_str),
        Some("nginx")
    );
    assert_eq!(
        module_summary(&store.inner, "podinfo").await,
        Some(SyncSummary {
            total: 1,
            updating: 1,
            ..SyncSummary::default()
        })
    );
}
