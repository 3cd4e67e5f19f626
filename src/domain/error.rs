//! Domain Error Types
//!
//! Ledger errors that don't depend on the web layer.

use thiserror::Error;

use super::{AccountId, Amount, AmountError, Balance, TransactionId};

/// Errors raised by account lifecycle and transfer operations
///
/// Validation errors are raised before any unit of work opens. Everything
/// else is raised inside one and causes a full rollback.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    /// Amount is not a valid decimal for this operation
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transfer to same account
    #[error("Source and destination accounts cannot be the same")]
    SameAccount,

    /// Source balance does not cover the amount
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Balance },

    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Account already exists: {0}")]
    AlreadyExists(AccountId),

    /// Credit would push the destination past the storable maximum
    #[error("Balance of account {0} would exceed the maximum storable value")]
    BalanceOverflow(AccountId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Lock, commit or IO failure in the store
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl LedgerError {
    pub fn insufficient_funds(required: Amount, available: Balance) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "invalid_amount",
            Self::SameAccount => "same_account",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::NotFound(_) => "account_not_found",
            Self::AlreadyExists(_) => "account_already_exists",
            Self::BalanceOverflow(_) => "balance_overflow",
            Self::TransactionNotFound(_) => "transaction_not_found",
            Self::Persistence(_) => "persistence_failure",
        }
    }

    /// Check if this error is detected before touching storage
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::InvalidAmount(_) | Self::SameAccount)
    }
}

impl From<AmountError> for LedgerError {
    fn from(err: AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}
