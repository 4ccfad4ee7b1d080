//! # fleet-store
//!
//! The declarative object store the controllers read and write.
//!
//! This crate provides:
//! - `ObjectMeta`, `OwnerReference` and the `Resource` trait for typed objects
//! - `ObjectStore`, the async boundary every controller talks to
//! - `MemoryStore`, the reference implementation (compare-and-swap writes,
//!   owner index, controller-owner garbage collection, watch stream)
//! - JSONL read/write for snapshots
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one line per object)
//!     ↕  load / save
//! MemoryStore (objects by key + owner index, one lock)
//!     ↓  broadcast
//! WatchEvent stream
//! ```

pub mod error;
pub mod jsonl;
pub mod memory;
pub mod object;
pub mod store;

pub use error::StoreError;
pub use jsonl::{JsonlError, read_objects, read_objects_from_path, write_objects, write_objects_to_path};
pub use memory::MemoryStore;
pub use object::{ObjectKey, ObjectMeta, OwnerReference, RawObject, Resource};
pub use store::{
    ConflictError, EventType, ObjectStore, ObjectStoreExt, OperationResult, WatchEvent,
    create_or_update, retry_on_conflict,
};
