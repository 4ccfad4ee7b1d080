//! Sync types: a versioned piece of configuration and how to apply it.

use crate::binding::Binding;
use crate::package::PackageSpec;
use serde::{Deserialize, Serialize};

/// A source plus how to apply it, possibly carrying bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sync {
    pub source: SourceSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageSpec>,
}

/// A sync with a name, unique within its owning list.
///
/// The name is the stable key used to match an existing rendered entry
/// across updates, so changing a sync updates objects in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSync {
    pub name: String,
    #[serde(flatten)]
    pub sync: Sync,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub git: GitSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSource {
    pub url: String,
    pub version: GitVersion,
}

/// Either a tag or a revision; exactly one should be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitVersion {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,
}

impl GitVersion {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            revision: String::new(),
        }
    }

    pub fn revision(revision: impl Into<String>) -> Self {
        Self {
            tag: String::new(),
            revision: revision.into(),
        }
    }
}

/// Outcome of the most recent attempt to apply a sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Updating,
    Succeeded,
    Failed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Updating => "updating",
            SyncState::Succeeded => "succeeded",
            SyncState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reported state of one named sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub name: String,
    pub state: SyncState,
}

/// Counts of the uses of a module in each state, at last count.
///
/// `total == updating + succeeded + failed` once a reconciliation settles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub total: u32,
    pub updating: u32,
    pub succeeded: u32,
    pub failed: u32,
}

impl SyncSummary {
    /// Count one use in `state`.
    pub fn record(&mut self, state: SyncState) {
        match state {
            SyncState::Succeeded => self.succeeded += 1,
            SyncState::Failed => self.failed += 1,
            SyncState::Updating => self.updating += 1,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.total == self.updating + self.succeeded + self.failed
    }
}
