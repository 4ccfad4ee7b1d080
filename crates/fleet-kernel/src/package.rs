//! Package compilation: a package spec plus resolved names becomes the
//! concrete spec of a package-application object.

use crate::expansion::expand;
use crate::sync::SyncState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PACKAGE_PATH: &str = ".";
pub const READY_CONDITION: &str = "Ready";
pub const RECONCILIATION_FAILED_REASON: &str = "ReconciliationFailed";

/// How the configuration at a source is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Path within the source to treat as the package root.
    #[serde(default = "default_path")]
    pub path: String,
    /// Names to substitute in the built package, each value a template.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub substitute: BTreeMap<String, String>,
}

fn default_path() -> String {
    DEFAULT_PACKAGE_PATH.to_string()
}

impl Default for PackageSpec {
    fn default() -> Self {
        Self {
            path: default_path(),
            substitute: BTreeMap::new(),
        }
    }
}

/// Reference to a source object in the referrer's namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

/// The compiled form written into a package-application object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageApplicationSpec {
    pub source_ref: SourceReference,
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub substitute: BTreeMap<String, String>,
    /// Credential for the cluster the package is applied to; absent means
    /// the cluster the object lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig_ref: Option<String>,
}

/// Compile `package` against `source_ref`, expanding each substitution
/// template through `mapping`.
pub fn compile(
    package: Option<&PackageSpec>,
    source_ref: SourceReference,
    mut mapping: impl FnMut(&str) -> String,
) -> PackageApplicationSpec {
    let Some(package) = package else {
        return PackageApplicationSpec {
            source_ref,
            path: default_path(),
            substitute: BTreeMap::new(),
            kubeconfig_ref: None,
        };
    };

    let substitute = package
        .substitute
        .iter()
        .map(|(key, template)| (key.clone(), expand(template, &mut mapping)))
        .collect();

    PackageApplicationSpec {
        source_ref,
        path: package.path.clone(),
        substitute,
        kubeconfig_ref: None,
    }
}

/// The readiness condition a package-application reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyCondition {
    #[serde(rename = "type")]
    pub type_: String,
    /// `"True"`, `"False"` or `"Unknown"`.
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Sync state implied by a package-application's conditions.
///
/// Ready=True is success; Ready=False is failure only when the reason says
/// reconciliation failed, and still in progress otherwise. No Ready condition
/// at all means it has not been looked at yet.
pub fn ready_state(conditions: &[ReadyCondition]) -> SyncState {
    let Some(ready) = conditions.iter().find(|c| c.type_ == READY_CONDITION) else {
        return SyncState::Updating;
    };
    match ready.status.as_str() {
        "True" => SyncState::Succeeded,
        "False" if ready.reason == RECONCILIATION_FAILED_REASON => SyncState::Failed,
        _ => SyncState::Updating,
    }
}
