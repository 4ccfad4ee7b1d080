//! Controllers that roll modules out across a fleet of clusters.
//!
//! A [`Module`](api::Module) names a sync and a cluster selector. The module
//! controller places one entry per module into the
//! [`Assemblage`](api::Assemblage) of every selected cluster; the assemblage
//! controller compiles each entry into a package application, or, in proxy
//! delivery, the proxy controller mirrors the assemblage into the target
//! cluster. [`Manager`] routes store changes to the right controller.

pub mod api;
pub mod assemblage_controller;
pub mod config;
pub mod error;
pub mod field_source;
pub mod manager;
pub mod module_controller;
pub mod proxy_controller;
pub mod queue;
pub mod remote;

pub use assemblage_controller::AssemblageController;
pub use config::{ConfigError, ControllerConfig, DeliveryMode};
pub use error::ReconcileError;
pub use field_source::StoreFieldSource;
pub use manager::{Manager, SettleReport};
pub use module_controller::ModuleController;
pub use proxy_controller::ProxyController;
pub use queue::WorkQueue;
pub use remote::{ADDRESS_KEY, CachedClientFactory, Connector, InMemoryConnector, RemoteClients, bounded};
