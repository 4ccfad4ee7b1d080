//! Mirror control-plane assemblages into their target clusters, and carry
//! the status reported there back.

use crate::api::{Assemblage, AssemblageSpec, GitRepository};
use crate::config::ControllerConfig;
use crate::error::ReconcileError;
use crate::remote::{RemoteClients, bounded};
use fleet_store::{
    ObjectStore, ObjectStoreExt, OperationResult, create_or_update, retry_on_conflict,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

pub struct ProxyController {
    store: Arc<dyn ObjectStore>,
    clients: Arc<dyn RemoteClients>,
    config: Arc<ControllerConfig>,
}

impl ProxyController {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        clients: Arc<dyn RemoteClients>,
        config: Arc<ControllerConfig>,
    ) -> Self {
        Self {
            store,
            clients,
            config,
        }
    }

    #[instrument(name = "proxy", skip(self))]
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<(), ReconcileError> {
        let store = self.store.as_ref();
        let Some(asm) = store.get::<Assemblage>(namespace, name).await? else {
            return Ok(());
        };
        let Some(kubeconfig) = &asm.spec.kubeconfig_ref else {
            return Ok(());
        };
        if store
            .get::<crate::api::Secret>(namespace, &kubeconfig.name)
            .await?
            .is_none()
        {
            tracing::debug!(credential = %kubeconfig.name, "credential not present yet; skipping");
            return Ok(());
        }

        let limit = self.config.remote_timeout();
        let remote = bounded(limit, self.clients.client(namespace, &kubeconfig.name)).await?;
        let remote = remote.as_ref();

        // Sources first, so the mirrored assemblage never refers to a
        // source the target cluster does not have.
        let mut copied = BTreeSet::new();
        for entry in &asm.spec.syncs {
            if !copied.insert(entry.source_ref.name.as_str()) {
                continue;
            }
            let Some(source) = store
                .get::<GitRepository>(namespace, &entry.source_ref.name)
                .await?
            else {
                tracing::debug!(source = %entry.source_ref.name, "source not created yet");
                continue;
            };
            bounded(limit, mirror_source(remote, &source)).await?;
        }

        let desired = &AssemblageSpec {
            kubeconfig_ref: None,
            syncs: asm.spec.syncs.clone(),
        };
        let (counterpart, op) = bounded(
            limit,
            create_or_update::<Assemblage, _, ReconcileError, _>(remote, namespace, name, |mirror| {
                mirror.spec = desired.clone();
                Ok(())
            }),
        )
        .await?;
        if op.wrote() {
            tracing::info!(assemblage = name, operation = ?op, "mirrored assemblage");
        }
        if op == OperationResult::Created {
            return Ok(());
        }

        let reported = &counterpart.status;
        retry_on_conflict(self.config.max_conflict_retries, move || async move {
            let Some(mut current) = store.get::<Assemblage>(namespace, name).await? else {
                return Ok(());
            };
            if current.status == *reported {
                return Ok(());
            }
            current.status = reported.clone();
            store.update_status(&current).await?;
            tracing::debug!(assemblage = name, "copied status from target cluster");
            Ok::<(), ReconcileError>(())
        })
        .await
    }
}

async fn mirror_source(
    remote: &dyn ObjectStore,
    source: &GitRepository,
) -> Result<(), ReconcileError> {
    let (_, op) = create_or_update::<GitRepository, _, ReconcileError, _>(
        remote,
        &source.metadata.namespace,
        &source.metadata.name,
        |copy| {
            copy.spec = source.spec.clone();
            Ok(())
        },
    )
    .await?;
    if op.wrote() {
        tracing::info!(source = %source.metadata.name, operation = ?op, "mirrored source");
    }
    Ok(())
}
