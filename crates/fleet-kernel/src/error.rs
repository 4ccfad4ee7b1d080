//! Error types for kernel operations.
//!
//! Everything here is a configuration error: it will not go away on retry
//! until the offending spec is corrected.

/// Errors arising from malformed module, sync or selector specs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// A binding sets neither or both of its source variants.
    #[error("unknown binding form for {name:?}: exactly one of value or objectFieldRef must be set")]
    UnknownBindingForm { name: String },

    /// A git source names neither a tag nor a revision.
    #[error("neither tag nor revision given in git source spec")]
    MissingGitVersion,

    /// A git source names both a tag and a revision.
    #[error("both tag {tag:?} and revision {revision:?} given in git source spec")]
    AmbiguousGitVersion { tag: String, revision: String },

    /// A label selector cannot be turned into a matcher.
    #[error("invalid label selector: {0}")]
    InvalidSelector(String),

    /// A field path is not a well-formed JSON pointer.
    #[error("invalid field path {path:?}: {reason}")]
    InvalidFieldPath { path: String, reason: String },
}

/// Why a [`FieldSource`](crate::FieldSource) could not answer a lookup.
///
/// Unlike [`KernelError`] this is usually transient.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Whatever holds the objects failed.
    #[error("lookup failed: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl LookupError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        LookupError::Backend(Box::new(err))
    }
}
