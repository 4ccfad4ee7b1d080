//! # Fleet Kernel
//!
//! The pure half of the fleet control plane: how a module's configuration is
//! turned into a cluster-specific package, independent of where objects are
//! stored or how clusters are reached.
//!
//! ## Architecture
//!
//! ```text
//! expansion        ← `$(name)` substitution, one pass, total
//!     │
//! binding          ← named value providers (literal / object field)
//!     │
//! resolve          ← memoized, cycle-checked evaluation of a binding list
//!     │
//! package          ← package spec + resolved names → package application
//!     │
//! selector         ← which clusters a module lands on
//! ```
//!
//! Storage and transport live in `fleet-store` and `fleet-control`; the
//! only outward seam here is [`resolve::FieldSource`].

pub mod binding;
pub mod error;
pub mod expansion;
pub mod package;
pub mod resolve;
pub mod selector;
pub mod source;
pub mod sync;

pub use binding::{Binding, BindingSource, ObjectFieldSelector, SourceKind};
pub use error::{KernelError, LookupError};
pub use expansion::{Segment, expand, mapping_for, parse, references, syntax_wrap};
pub use package::{
    PackageApplicationSpec, PackageSpec, READY_CONDITION, RECONCILIATION_FAILED_REASON,
    ReadyCondition, SourceReference, compile, ready_state,
};
pub use resolve::{Diagnostic, FieldSource, ResolvedBinding, Resolver};
pub use selector::{LabelSelector, LabelSelectorRequirement, Operator, Selection, matches, select};
pub use source::{GitRepositoryRef, GitRepositorySpec, populate_git_repository};
pub use sync::{
    GitSource, GitVersion, NamedSync, SourceSpec, Sync, SyncState, SyncStatus, SyncSummary,
};
