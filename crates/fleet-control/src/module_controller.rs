//! Module reconciliation: fan a module out to the assemblage of every
//! cluster its selector picks, and fan the per-cluster status back in.

use crate::api::{
    Assemblage, AssemblageSync, Cluster, GitRepository, KubeconfigReference, Module, ModuleStatus,
};
use crate::config::ControllerConfig;
use crate::error::ReconcileError;
use crate::field_source::StoreFieldSource;
use fleet_kernel::{
    Diagnostic, ResolvedBinding, Resolver, SourceReference, SyncState, SyncSummary, binding,
    populate_git_repository, select, syntax_wrap,
};
use fleet_store::{
    ObjectKey, ObjectStore, ObjectStoreExt, OwnerReference, Resource, create_or_update,
    retry_on_conflict,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

type Fields<'a> = StoreFieldSource<'a, dyn ObjectStore>;

pub struct ModuleController {
    store: Arc<dyn ObjectStore>,
    config: Arc<ControllerConfig>,
}

impl ModuleController {
    pub fn new(store: Arc<dyn ObjectStore>, config: Arc<ControllerConfig>) -> Self {
        Self { store, config }
    }

    #[instrument(name = "module", skip(self))]
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<(), ReconcileError> {
        let store = self.store.as_ref();
        let Some(module) = store.get::<Module>(namespace, name).await? else {
            // Gone: withdraw it from every assemblage it was placed in.
            return self.withdraw(namespace, name, &BTreeSet::new()).await;
        };

        binding::validate(&module.spec.control_plane_bindings)?;
        binding::validate(&module.spec.sync.bindings)?;
        let fields = StoreFieldSource::new(store, namespace);
        self.preflight(&module, &fields).await;

        let source_ref = self.ensure_source(&module).await?;

        let clusters: Vec<Cluster> = store.list(Some(namespace), None).await?;
        let selected = select(module.spec.selector.as_ref(), &clusters, |c| &c.metadata.labels)?;
        let (ready, waiting): (Vec<&Cluster>, Vec<&Cluster>) = selected
            .into_iter()
            .partition(|c| c.status.control_plane_ready);

        let mut summary = SyncSummary {
            total: u32::try_from(ready.len()).unwrap_or(u32::MAX),
            ..SyncSummary::default()
        };
        let mut required = BTreeSet::new();
        for cluster in waiting {
            // Nothing new lands on an unready cluster, but an entry placed
            // before it went unready stays where it is.
            tracing::info!(cluster = %cluster.metadata.name, "waiting for cluster to be ready");
            required.insert(cluster.metadata.name.clone());
        }
        let mut failed = 0;
        for cluster in ready {
            // Required whether or not the upsert below succeeds, so a
            // transient failure never withdraws an existing entry.
            required.insert(cluster.metadata.name.clone());
            match self.place(&module, cluster, &source_ref, &fields).await {
                Ok(asm) => {
                    summary.record(asm.sync_state(name).unwrap_or(SyncState::Updating));
                }
                Err(err) => {
                    tracing::error!(cluster = %cluster.metadata.name, error = %err, "updating assemblage");
                    summary.record(SyncState::Failed);
                    failed += 1;
                }
            }
        }

        self.withdraw(namespace, name, &required).await?;
        self.write_status(&module, summary).await?;

        if failed > 0 {
            return Err(ReconcileError::Partial {
                failed,
                total: summary.total,
            });
        }
        Ok(())
    }

    /// Resolve the control-plane bindings with the cluster name left as a
    /// reference, to surface problems that do not depend on the cluster.
    async fn preflight(&self, module: &Module, fields: &Fields<'_>) {
        let cluster_binding = &self.config.cluster_name_binding;
        let mut resolver = Resolver::new(&module.spec.control_plane_bindings, fields)
            .seed(cluster_binding, syntax_wrap(cluster_binding));
        resolver.resolve_all().await;
        for diagnostic in resolver.diagnostics() {
            tracing::debug!(%diagnostic, "pre-flight binding resolution");
        }
    }

    /// Create or update the source shared by every cluster the module lands on.
    async fn ensure_source(&self, module: &Module) -> Result<SourceReference, ReconcileError> {
        let store = self.store.as_ref();
        let namespace = module.metadata.namespace.as_str();
        let name = module.metadata.name.as_str();
        let interval = self.config.source_interval_secs;

        let (source, op) = retry_on_conflict(self.config.max_conflict_retries, move || {
            create_or_update::<GitRepository, _, ReconcileError, _>(
                store,
                namespace,
                name,
                move |source| {
                    populate_git_repository(&mut source.spec, &module.spec.sync, interval)?;
                    if !source.metadata.set_controller(OwnerReference::to(module, true)) {
                        tracing::warn!(source = name, "source is controlled by another object");
                    }
                    Ok(())
                },
            )
        })
        .await?;
        if op.wrote() {
            tracing::info!(source = name, operation = ?op, "source git repository");
        }
        Ok(source.source_ref())
    }

    /// Upsert the module's entry in `cluster`'s assemblage.
    async fn place(
        &self,
        module: &Module,
        cluster: &Cluster,
        source_ref: &SourceReference,
        fields: &Fields<'_>,
    ) -> Result<Assemblage, ReconcileError> {
        let store = self.store.as_ref();
        let namespace = module.metadata.namespace.as_str();
        let cluster_name = cluster.metadata.name.as_str();

        let mut resolver = Resolver::new(&module.spec.control_plane_bindings, fields)
            .seed(&self.config.cluster_name_binding, cluster_name);
        let resolved = resolver.resolve_all().await;
        warn_diagnostics(resolver.diagnostics(), cluster_name);

        let entry = &AssemblageSync {
            name: module.metadata.name.clone(),
            control_plane_bindings: resolved
                .into_iter()
                .map(ResolvedBinding::into_literal)
                .collect(),
            bindings: module.spec.sync.bindings.clone(),
            source_ref: source_ref.clone(),
            package: module.spec.sync.package.clone(),
        };
        let kubeconfig = &KubeconfigReference {
            name: self.config.kubeconfig_name(cluster_name),
        };

        let (asm, op) = retry_on_conflict(self.config.max_conflict_retries, move || {
            create_or_update::<Assemblage, _, ReconcileError, _>(
                store,
                namespace,
                cluster_name,
                move |asm| {
                    asm.upsert_entry(entry.clone());
                    asm.metadata.add_owner(OwnerReference::to(module, false));
                    if !asm.metadata.set_controller(OwnerReference::to(cluster, true)) {
                        tracing::warn!(
                            assemblage = cluster_name,
                            "assemblage is controlled by something other than its cluster"
                        );
                    }
                    asm.spec.kubeconfig_ref = Some(kubeconfig.clone());
                    Ok(())
                },
            )
        })
        .await?;

        if op.wrote() {
            tracing::info!(assemblage = cluster_name, operation = ?op, "updated assemblage");
        } else {
            tracing::debug!(assemblage = cluster_name, "assemblage up to date");
        }
        Ok(asm)
    }

    /// Remove the module from every assemblage it owns whose cluster is not
    /// in `required`.
    async fn withdraw(
        &self,
        namespace: &str,
        module_name: &str,
        required: &BTreeSet<String>,
    ) -> Result<(), ReconcileError> {
        let store = self.store.as_ref();
        let owner = ObjectKey::of::<Module>(namespace, module_name);
        let owned: Vec<Assemblage> = store.owned(&owner).await?;

        for asm in owned {
            if required.contains(&asm.metadata.name) {
                continue;
            }
            let asm_name = asm.metadata.name.as_str();
            retry_on_conflict(self.config.max_conflict_retries, move || async move {
                let Some(mut current) = store.get::<Assemblage>(namespace, asm_name).await? else {
                    return Ok(());
                };
                let removed = current.remove_entry(module_name);
                let released = current.metadata.remove_owner(Module::KIND, module_name);
                if removed || released {
                    store.update(&current).await?;
                    tracing::info!(assemblage = asm_name, "removed module from assemblage");
                }
                Ok::<(), ReconcileError>(())
            })
            .await?;
        }
        Ok(())
    }

    async fn write_status(
        &self,
        module: &Module,
        summary: SyncSummary,
    ) -> Result<(), ReconcileError> {
        let store = self.store.as_ref();
        let namespace = module.metadata.namespace.as_str();
        let name = module.metadata.name.as_str();
        let desired = &ModuleStatus {
            observed_sync: Some(module.spec.sync.clone()),
            summary: Some(summary),
        };

        retry_on_conflict(self.config.max_conflict_retries, move || async move {
            let Some(mut current) = store.get::<Module>(namespace, name).await? else {
                return Ok(());
            };
            // The summary describes `module.spec`; it must not land on a
            // newer spec than the one it was computed from.
            if current.metadata.uid != module.metadata.uid || current.spec != module.spec {
                return Err(ReconcileError::Superseded(current.key()));
            }
            if current.status == *desired {
                return Ok(());
            }
            current.status = desired.clone();
            store.update_status(&current).await?;
            tracing::debug!(?summary, "module status");
            Ok::<(), ReconcileError>(())
        })
        .await
    }
}

fn warn_diagnostics(diagnostics: &[Diagnostic], cluster: &str) {
    for diagnostic in diagnostics {
        tracing::warn!(cluster, %diagnostic, "binding resolution");
    }
}
