//! Event routing and the reconcile loop.
//!
//! Every store change is mapped to the objects whose reconciliation depends
//! on it ([`Manager::dependents`]) and those are queued. Reconciliation is
//! level-triggered: a handler always works from current state, so a key
//! being queued more than once is harmless.

use crate::api::{Assemblage, Cluster, Module, PackageApplication, Secret};
use crate::assemblage_controller::AssemblageController;
use crate::config::{ControllerConfig, DeliveryMode};
use crate::error::ReconcileError;
use crate::module_controller::ModuleController;
use crate::proxy_controller::ProxyController;
use crate::queue::WorkQueue;
use crate::remote::RemoteClients;
use fleet_kernel::matches;
use fleet_store::{ObjectKey, ObjectStore, ObjectStoreExt, RawObject, Resource, WatchEvent};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinSet;

/// Outcome of [`Manager::run_until_settled`].
#[derive(Debug, Default)]
pub struct SettleReport {
    /// Reconciliations run, including retries.
    pub reconciled: usize,
    /// Keys given up on after exhausting their re-queues, with the last error.
    pub failed: BTreeMap<ObjectKey, String>,
}

pub struct Manager {
    store: Arc<dyn ObjectStore>,
    config: Arc<ControllerConfig>,
    modules: ModuleController,
    assemblages: AssemblageController,
    proxy: Option<ProxyController>,
    queue: WorkQueue,
    attempts: Mutex<BTreeMap<ObjectKey, u32>>,
}

impl Manager {
    pub fn new(store: Arc<dyn ObjectStore>, config: ControllerConfig) -> Self {
        let config = Arc::new(config);
        Self {
            modules: ModuleController::new(store.clone(), config.clone()),
            assemblages: AssemblageController::new(store.clone(), config.clone()),
            proxy: None,
            queue: WorkQueue::new(),
            attempts: Mutex::new(BTreeMap::new()),
            store,
            config,
        }
    }

    /// Use `clients` to reach target clusters in proxy delivery.
    pub fn with_remote_clients(mut self, clients: Arc<dyn RemoteClients>) -> Self {
        self.proxy = Some(ProxyController::new(
            self.store.clone(),
            clients,
            self.config.clone(),
        ));
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Queue every module and assemblage.
    pub async fn resync(&self) -> Result<(), ReconcileError> {
        for kind in [Module::KIND, Assemblage::KIND] {
            for object in self.store.list_raw(kind, None, None).await? {
                self.queue.add(object.key());
            }
        }
        Ok(())
    }

    /// Keys whose reconciliation reads the object in `event`.
    pub async fn dependents(&self, event: &WatchEvent) -> Result<Vec<ObjectKey>, ReconcileError> {
        let object = &event.object;
        let namespace = object.metadata.namespace.as_str();
        let mut keys = BTreeSet::new();

        match object.kind.as_str() {
            Module::KIND => {
                keys.insert(object.key());
            }
            Assemblage::KIND => {
                keys.insert(object.key());
                keys.extend(owners_of_kind(object, Module::KIND));
            }
            Cluster::KIND => {
                let modules: Vec<Module> = self.store.list(Some(namespace), None).await?;
                for module in modules {
                    match matches(module.spec.selector.as_ref(), &object.metadata.labels) {
                        Ok(true) => {
                            keys.insert(module.key());
                        }
                        Ok(false) => {}
                        Err(error) => {
                            tracing::debug!(module = %module.metadata.name, %error, "skipping module");
                        }
                    }
                }
                // Modules already placed on the cluster, which may no longer
                // select it.
                let placed = ObjectKey::of::<Assemblage>(namespace, &object.metadata.name);
                if let Some(asm) = self.store.get_raw(&placed).await? {
                    keys.extend(owners_of_kind(&asm, Module::KIND));
                }
            }
            PackageApplication::KIND => {
                keys.extend(
                    object
                        .metadata
                        .controller()
                        .filter(|c| c.kind == Assemblage::KIND)
                        .map(|c| ObjectKey::of::<Assemblage>(namespace, &c.name)),
                );
            }
            Secret::KIND => {
                let assemblages: Vec<Assemblage> = self.store.list(Some(namespace), None).await?;
                keys.extend(
                    assemblages
                        .iter()
                        .filter(|a| {
                            a.spec
                                .kubeconfig_ref
                                .as_ref()
                                .is_some_and(|k| k.name == object.metadata.name)
                        })
                        .map(Resource::key),
                );
            }
            _ => {}
        }
        Ok(keys.into_iter().collect())
    }

    /// Reconcile one key with the controller for its kind.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<(), ReconcileError> {
        match key.kind.as_str() {
            Module::KIND => self.modules.reconcile(&key.namespace, &key.name).await,
            Assemblage::KIND => {
                let Some(asm) = self
                    .store
                    .get::<Assemblage>(&key.namespace, &key.name)
                    .await?
                else {
                    return Ok(());
                };
                if asm.is_local() || self.config.delivery == DeliveryMode::Direct {
                    return self.assemblages.reconcile(&key.namespace, &key.name).await;
                }
                match &self.proxy {
                    Some(proxy) => proxy.reconcile(&key.namespace, &key.name).await,
                    None => Err(ReconcileError::Unreachable(
                        "proxy delivery configured without a remote client factory".to_string(),
                    )),
                }
            }
            other => {
                tracing::debug!(kind = other, "no controller for kind");
                Ok(())
            }
        }
    }

    /// Work the queue sequentially until no work is left.
    ///
    /// Starts with every module and assemblage queued. Returns once the
    /// queue is empty and every change the work caused has been routed.
    pub async fn run_until_settled(&self) -> Result<SettleReport, ReconcileError> {
        let mut events = self.store.watch();
        self.resync().await?;
        let mut report = SettleReport::default();

        loop {
            self.route_pending(&mut events).await?;
            let Some(key) = self.queue.try_pop() else {
                break;
            };
            let result = self.reconcile(&key).await;
            self.queue.done(&key);
            report.reconciled += 1;
            match self.settle(&key, result) {
                Settled::Done => {}
                Settled::Retry(_) => self.queue.add(key),
                Settled::GaveUp(error) => {
                    report.failed.insert(key, error);
                }
            }
        }
        Ok(report)
    }

    /// Run with `config.workers` concurrent workers until `shutdown`
    /// completes.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()>) -> Result<(), ReconcileError> {
        let mut events = self.store.watch();
        self.resync().await?;

        let mut tasks = JoinSet::new();
        for worker in 0..self.config.workers {
            let manager = Arc::clone(&self);
            tasks.spawn(async move {
                loop {
                    let key = manager.queue.pop().await;
                    tracing::trace!(worker, %key, "reconciling");
                    let result = manager.reconcile(&key).await;
                    manager.queue.done(&key);
                    match manager.settle(&key, result) {
                        Settled::Done => {}
                        Settled::Retry(attempt) => {
                            let manager = Arc::clone(&manager);
                            tokio::spawn(async move {
                                tokio::time::sleep(backoff(attempt)).await;
                                manager.queue.add(key);
                            });
                        }
                        Settled::GaveUp(error) => {
                            tracing::error!(%key, %error, "giving up until the next change");
                        }
                    }
                }
            });
        }

        let router = Arc::clone(&self);
        tasks.spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => router.route(&event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "watch lagged; resyncing");
                        if let Err(error) = router.resync().await {
                            tracing::error!(%error, "resync failed");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let resync = Arc::clone(&self);
        let period = Duration::from_secs(self.config.resync_interval_secs);
        tasks.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(error) = resync.resync().await {
                    tracing::error!(%error, "periodic resync failed");
                }
            }
        });

        shutdown.await;
        tracing::info!("shutting down");
        tasks.shutdown().await;
        Ok(())
    }

    async fn route(&self, event: &WatchEvent) {
        match self.dependents(event).await {
            Ok(keys) => {
                for key in keys {
                    self.queue.add(key);
                }
            }
            Err(error) => {
                tracing::warn!(object = %event.object.key(), %error, "routing change");
            }
        }
    }

    async fn route_pending(
        &self,
        events: &mut tokio::sync::broadcast::Receiver<WatchEvent>,
    ) -> Result<(), ReconcileError> {
        loop {
            match events.try_recv() {
                Ok(event) => self.route(&event).await,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "watch lagged; resyncing");
                    self.resync().await?;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
            }
        }
    }

    /// Record the outcome for `key` and decide whether to try it again.
    fn settle(&self, key: &ObjectKey, result: Result<(), ReconcileError>) -> Settled {
        let error = match result {
            Ok(()) => {
                self.attempts.lock().remove(key);
                return Settled::Done;
            }
            Err(error) => error,
        };

        let attempt = {
            let mut attempts = self.attempts.lock();
            let attempt = attempts.entry(key.clone()).or_insert(0);
            *attempt += 1;
            *attempt
        };
        // Configuration errors are retried too, but will not clear until the
        // object is edited.
        if error.is_retryable() {
            tracing::warn!(%key, attempt, %error, "reconcile failed");
        } else {
            tracing::error!(%key, attempt, %error, "reconcile failed");
        }

        if attempt > self.config.max_requeues {
            self.attempts.lock().remove(key);
            return Settled::GaveUp(error.to_string());
        }
        Settled::Retry(attempt)
    }
}

enum Settled {
    Done,
    Retry(u32),
    GaveUp(String),
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2u64.pow(attempt.min(8)))
}

fn owners_of_kind<'a>(object: &'a RawObject, kind: &'a str) -> impl Iterator<Item = ObjectKey> + 'a {
    object
        .metadata
        .owner_references
        .iter()
        .filter(move |o| o.kind == kind)
        .map(move |o| ObjectKey::new(kind, &object.metadata.namespace, &o.name))
}
