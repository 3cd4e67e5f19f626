//! Domain module
//!
//! Core ledger types and the pure validation rules.

pub mod account;
pub mod amount;
pub mod error;
pub mod transaction;
pub mod validation;

pub use account::{Account, AccountId, AccountIdError};
pub use amount::{Amount, AmountError, Balance};
pub use error::LedgerError;
pub use transaction::{NewTransaction, TransactionId, TransactionRecord, TransactionStatus};
