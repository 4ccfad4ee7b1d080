//! Assemblage reconciliation: compile each entry into a package application
//! and report how each one is doing.

use crate::api::{Assemblage, PackageApplication, Secret};
use crate::config::ControllerConfig;
use crate::error::ReconcileError;
use crate::field_source::StoreFieldSource;
use fleet_kernel::{Binding, Resolver, SyncState, SyncStatus, compile, references};
use fleet_store::{
    ObjectStore, ObjectStoreExt, OwnerReference, Resource, create_or_update, retry_on_conflict,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

pub struct AssemblageController {
    store: Arc<dyn ObjectStore>,
    config: Arc<ControllerConfig>,
}

impl AssemblageController {
    pub fn new(store: Arc<dyn ObjectStore>, config: Arc<ControllerConfig>) -> Self {
        Self { store, config }
    }

    #[instrument(name = "assemblage", skip(self))]
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<(), ReconcileError> {
        let store = self.store.as_ref();
        let Some(asm) = store.get::<Assemblage>(namespace, name).await? else {
            return Ok(());
        };

        if let Some(kubeconfig) = &asm.spec.kubeconfig_ref
            && store.get::<Secret>(namespace, &kubeconfig.name).await?.is_none()
        {
            tracing::debug!(credential = %kubeconfig.name, "credential not present yet; skipping");
            return Ok(());
        }

        // Assemblages are named after the cluster they target.
        let cluster_name = asm.metadata.name.as_str();
        let fields = StoreFieldSource::new(store, namespace);
        let mut statuses = Vec::with_capacity(asm.spec.syncs.len());
        let mut expected = BTreeSet::new();

        for entry in &asm.spec.syncs {
            let definitions: Vec<Binding> = if asm.is_local() {
                entry
                    .control_plane_bindings
                    .iter()
                    .chain(&entry.bindings)
                    .cloned()
                    .collect()
            } else {
                entry.control_plane_bindings.clone()
            };
            let mut resolver = Resolver::new(&definitions, &fields)
                .seed(&self.config.cluster_name_binding, cluster_name);

            // Resolve everything the substitutions mention up front; names
            // nothing defines stay as references for a later evaluator.
            if let Some(package) = &entry.package {
                for template in package.substitute.values() {
                    for reference in references(template) {
                        resolver.resolve(&reference).await;
                    }
                }
            }
            for diagnostic in resolver.diagnostics() {
                tracing::warn!(sync = %entry.name, %diagnostic, "binding resolution");
            }

            let mut spec = compile(entry.package.as_ref(), entry.source_ref.clone(), resolver.mapping());
            spec.kubeconfig_ref = asm.spec.kubeconfig_ref.as_ref().map(|k| k.name.clone());

            let app_name = PackageApplication::name_for(&entry.name, cluster_name);
            let app_key = app_name.as_str();
            let spec = &spec;
            let asm_ref = &asm;
            let (app, op) = retry_on_conflict(self.config.max_conflict_retries, move || {
                create_or_update::<PackageApplication, _, ReconcileError, _>(
                    store,
                    namespace,
                    app_key,
                    move |app| {
                        app.spec = spec.clone();
                        app.metadata.set_controller(OwnerReference::to(asm_ref, true));
                        Ok(())
                    },
                )
            })
            .await?;

            let state = if op.wrote() {
                tracing::info!(application = %app_name, operation = ?op, "package application");
                SyncState::Updating
            } else {
                app.state()
            };
            statuses.push(SyncStatus {
                name: entry.name.clone(),
                state,
            });
            expected.insert(app_name);
        }

        self.prune(&asm, &expected).await?;
        self.write_status(&asm, statuses).await
    }

    /// Delete package applications this assemblage controls that no entry
    /// produces any more.
    async fn prune(&self, asm: &Assemblage, expected: &BTreeSet<String>) -> Result<(), ReconcileError> {
        let store = self.store.as_ref();
        let owned: Vec<PackageApplication> = store.owned(&asm.key()).await?;
        for app in owned {
            let controlled = app
                .metadata
                .controller()
                .is_some_and(|c| c.refers_to(Assemblage::KIND, &asm.metadata.name));
            if controlled && !expected.contains(&app.metadata.name) {
                store.delete(&app.key()).await?;
                tracing::info!(application = %app.metadata.name, "pruned package application");
            }
        }
        Ok(())
    }

    async fn write_status(
        &self,
        asm: &Assemblage,
        statuses: Vec<SyncStatus>,
    ) -> Result<(), ReconcileError> {
        let store = self.store.as_ref();
        let namespace = asm.metadata.namespace.as_str();
        let name = asm.metadata.name.as_str();
        let statuses = &statuses;

        retry_on_conflict(self.config.max_conflict_retries, move || async move {
            let Some(mut current) = store.get::<Assemblage>(namespace, name).await? else {
                return Ok(());
            };
            if current.status.syncs == *statuses {
                return Ok(());
            }
            current.status.syncs = statuses.clone();
            store.update_status(&current).await?;
            Ok::<(), ReconcileError>(())
        })
        .await
    }
}
