//! Reconciliation errors.

use fleet_kernel::KernelError;
use fleet_store::{ConflictError, ObjectKey, StoreError};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The object is malformed; retrying will not help until it is edited.
    #[error("configuration error: {0}")]
    Config(#[from] KernelError),

    #[error("remote cluster unreachable: {0}")]
    Unreachable(String),

    #[error("remote operation timed out after {0:?}")]
    Timeout(Duration),

    /// The object changed while it was being reconciled; the outcome of
    /// this pass describes a spec that is no longer current.
    #[error("{0} changed during reconciliation")]
    Superseded(ObjectKey),

    /// Some selected clusters could not be updated; the rest were.
    #[error("{failed} of {total} clusters failed to update")]
    Partial { failed: u32, total: u32 },
}

impl ReconcileError {
    /// Whether the reconciliation is worth re-queueing as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::Store(err) => err.is_retryable(),
            ReconcileError::Config(_) => false,
            ReconcileError::Unreachable(_)
            | ReconcileError::Timeout(_)
            | ReconcileError::Superseded(_)
            | ReconcileError::Partial { .. } => true,
        }
    }
}

impl ConflictError for ReconcileError {
    fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::Store(err) if err.is_conflict())
    }
}
