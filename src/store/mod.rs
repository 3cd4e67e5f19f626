//! Ledger Store module
//!
//! Storage ports used by the account lifecycle and the transfer engine,
//! with a PostgreSQL adapter and an in-process adapter.
//!
//! Reads outside a unit of work see the latest committed state. Everything
//! done through a [`UnitOfWork`] becomes visible to other readers only when
//! it commits, and row locks taken inside it are held until it ends.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Account, AccountId, Balance, NewTransaction, TransactionId, TransactionRecord};

pub use error::StoreError;
#[cfg(test)]
pub use memory::FailPoint;
pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Account store and transaction log entry points
#[async_trait]
pub trait LedgerStore: Clone + Send + Sync + 'static {
    type Unit: UnitOfWork;

    /// Open an atomic unit of work
    async fn begin(&self) -> StoreResult<Self::Unit>;

    /// Insert a new account.
    ///
    /// The store's uniqueness guard is authoritative: a concurrent insert of
    /// the same id fails with `StoreError::AccountExists`.
    async fn create_account(&self, id: AccountId, initial_balance: Balance) -> StoreResult<Account>;

    /// Unlocked point lookup of the latest committed snapshot
    async fn get_account(&self, id: AccountId) -> StoreResult<Account>;

    /// Read back a committed transaction record
    async fn get_transaction(&self, id: TransactionId) -> StoreResult<TransactionRecord>;
}

/// One atomic, all-or-nothing sequence of reads and writes.
///
/// Dropping a unit of work without committing rolls it back.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read an account while taking an exclusive lock on its row until this unit ends
    async fn get_for_update(&mut self, id: AccountId) -> StoreResult<Account>;

    /// Overwrite the balance of an account and refresh `updated_at`
    async fn set_balance(&mut self, id: AccountId, balance: Balance) -> StoreResult<()>;

    /// Append a transaction record, returning the store-assigned id
    async fn append(&mut self, transaction: &NewTransaction) -> StoreResult<TransactionId>;

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}
