use thiserror::Error;

use stockwise_auth::AuthzError;
use stockwise_core::DomainError;

use crate::ledger_store::LedgerStoreError;
use crate::projections::ProjectionError;

/// Error returned by the inventory services.
///
/// Validation and authorization failures are raised before anything is
/// written. Gateway failures never surface here; they are absorbed by the
/// outbox.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthzError),

    #[error("not found: {0}")]
    NotFound(String),

    /// Stale revision; retrying the operation is safe.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("ledger store error: {0}")]
    Store(LedgerStoreError),

    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),
}

impl From<DomainError> for InventoryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => InventoryError::Validation(msg),
            DomainError::InvariantViolation(msg) => InventoryError::InvariantViolation(msg),
            DomainError::Conflict(msg) => InventoryError::Conflict(msg),
            DomainError::NotFound(msg) => InventoryError::NotFound(msg),
        }
    }
}

impl From<LedgerStoreError> for InventoryError {
    fn from(value: LedgerStoreError) -> Self {
        match value {
            LedgerStoreError::Concurrency(msg) => InventoryError::Conflict(msg),
            other => InventoryError::Store(other),
        }
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;
