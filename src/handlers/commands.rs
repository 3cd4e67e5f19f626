//! Command definitions
//!
//! Commands represent intentions to change the ledger.

use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, Amount, Balance, TransactionId, TransactionStatus};

use super::TransferState;

// =========================================================================
// CreateAccountCommand
// =========================================================================

/// Command to open a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountCommand {
    pub account_id: AccountId,
    /// Initial balance (as string for precise decimal)
    pub initial_balance: String,
}

impl CreateAccountCommand {
    pub fn new(account_id: AccountId, initial_balance: impl Into<String>) -> Self {
        Self {
            account_id,
            initial_balance: initial_balance.into(),
        }
    }
}

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move funds between two accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    /// Amount to transfer (as string for precise decimal)
    pub amount: String,
}

impl TransferCommand {
    pub fn new(
        source_account_id: AccountId,
        destination_account_id: AccountId,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            source_account_id,
            destination_account_id,
            amount: amount.into(),
        }
    }
}

/// Result of a committed transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub transaction_id: TransactionId,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub state: TransferState,
    pub source_balance: Balance,
    pub destination_balance: Balance,
}
