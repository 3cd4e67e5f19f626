//! Store Errors
//!
//! Error types for account store and transaction log operations.

use crate::domain::{AccountId, LedgerError, TransactionId};

/// Errors that can occur in a ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Insert hit the primary key of an existing account
    #[error("Account already exists: {0}")]
    AccountExists(AccountId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Row lock was not granted within the store's lock timeout
    #[error("Timed out waiting for lock on account {0}")]
    LockTimeout(AccountId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored row does not satisfy a domain invariant
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Store failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Check if this error is a missing row rather than a store failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::AccountNotFound(_) | StoreError::TransactionNotFound(_)
        )
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => LedgerError::NotFound(id),
            StoreError::AccountExists(id) => LedgerError::AlreadyExists(id),
            StoreError::TransactionNotFound(id) => LedgerError::TransactionNotFound(id),
            other => LedgerError::Persistence(other.to_string()),
        }
    }
}
