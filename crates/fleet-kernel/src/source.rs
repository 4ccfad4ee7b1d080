//! Source objects: where a module's configuration is fetched from.

use crate::error::KernelError;
use crate::sync::Sync;
use serde::{Deserialize, Serialize};

pub const GIT_REPOSITORY_API_VERSION: &str = "source.toolkit.fluxcd.io/v1beta1";
pub const GIT_REPOSITORY_KIND: &str = "GitRepository";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositorySpec {
    pub url: String,
    /// Poll interval in seconds.
    #[serde(rename = "intervalSeconds")]
    pub interval_secs: u64,
    #[serde(rename = "ref", default)]
    pub reference: GitRepositoryRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepositoryRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit: String,
}

/// Fill `dst` so that it fetches the source named by `sync`.
///
/// A tag becomes the ref's tag and a revision its commit; any branch already
/// on `dst` is kept. Setting neither or both is a configuration error and
/// leaves `dst` untouched.
pub fn populate_git_repository(
    dst: &mut GitRepositorySpec,
    sync: &Sync,
    interval_secs: u64,
) -> Result<(), KernelError> {
    let git = &sync.source.git;
    let version = &git.version;
    let (tag, commit) = match (version.tag.is_empty(), version.revision.is_empty()) {
        (false, true) => (version.tag.clone(), String::new()),
        (true, false) => (String::new(), version.revision.clone()),
        (true, true) => return Err(KernelError::MissingGitVersion),
        (false, false) => {
            return Err(KernelError::AmbiguousGitVersion {
                tag: version.tag.clone(),
                revision: version.revision.clone(),
            });
        }
    };

    dst.url = git.url.clone();
    dst.interval_secs = interval_secs;
    dst.reference.tag = tag;
    dst.reference.commit = commit;
    Ok(())
}
