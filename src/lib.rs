//! transfer_ledger Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod domain;
pub mod handlers;
pub mod store;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use domain::{Account, AccountId, Amount, AmountError, Balance, LedgerError};
pub use store::{LedgerStore, MemoryStore, PgStore};
