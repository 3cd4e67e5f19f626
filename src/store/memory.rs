//! In-memory Ledger Store
//!
//! Process-local store with the same visibility and locking contract as the
//! PostgreSQL store: one async mutex per account row, held by a unit of work
//! until it commits or is dropped, and writes staged privately until commit.
//! Used by the `memory` storage backend and by the test suite.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::OwnedMutexGuard;

use crate::domain::{
    Account, AccountId, Balance, NewTransaction, TransactionId, TransactionRecord,
};

use super::{LedgerStore, StoreError, StoreResult, UnitOfWork};

/// Operation that can be made to fail once, to exercise rollback paths
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    SetBalance,
    Append,
    Commit,
}

#[derive(Debug, Default)]
struct Committed {
    accounts: BTreeMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, TransactionRecord>,
}

#[derive(Debug)]
struct Inner {
    committed: RwLock<Committed>,
    row_locks: Mutex<HashMap<AccountId, Arc<tokio::sync::Mutex<()>>>>,
    next_transaction_id: AtomicI64,
    lock_timeout: Duration,
    #[cfg(test)]
    fail_next: Mutex<Option<FailPoint>>,
}

/// Ledger store kept in process memory
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(Duration::from_secs(5))
    }

    /// Bound how long `get_for_update` may wait for a row lock
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                committed: RwLock::new(Committed::default()),
                row_locks: Mutex::new(HashMap::new()),
                next_transaction_id: AtomicI64::new(1),
                lock_timeout,
                #[cfg(test)]
                fail_next: Mutex::new(None),
            }),
        }
    }

    /// Make the next call to `point` in any unit of work fail
    #[cfg(test)]
    pub fn fail_next(&self, point: FailPoint) {
        *self
            .inner
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(point);
    }

    /// All committed transaction records, in id order
    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.read_committed().transactions.values().cloned().collect()
    }

    /// Sum of all committed balances
    pub fn total_balance(&self) -> Decimal {
        self.read_committed()
            .accounts
            .values()
            .map(|account| account.balance.value())
            .sum()
    }

    fn read_committed(&self) -> std::sync::RwLockReadGuard<'_, Committed> {
        self.inner
            .committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_committed(&self) -> std::sync::RwLockWriteGuard<'_, Committed> {
        self.inner
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn row_lock(&self, id: AccountId) -> StoreResult<Arc<tokio::sync::Mutex<()>>> {
        self.inner
            .row_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(id))
    }

    #[cfg(test)]
    fn trip(&self, point: FailPoint) -> StoreResult<()> {
        let mut fail_next = self
            .inner
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if *fail_next == Some(point) {
            *fail_next = None;
            return Err(StoreError::Backend(format!("injected {point:?} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Unit = MemoryUnitOfWork;

    async fn begin(&self) -> StoreResult<MemoryUnitOfWork> {
        Ok(MemoryUnitOfWork {
            store: self.clone(),
            held: HashMap::new(),
            staged_accounts: HashMap::new(),
            staged_transactions: Vec::new(),
        })
    }

    async fn create_account(&self, id: AccountId, initial_balance: Balance) -> StoreResult<Account> {
        let account = Account::open(id, initial_balance);

        let mut committed = self.write_committed();
        if committed.accounts.contains_key(&id) {
            return Err(StoreError::AccountExists(id));
        }
        committed.accounts.insert(id, account.clone());

        self.inner
            .row_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(tokio::sync::Mutex::new(())));

        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> StoreResult<Account> {
        self.read_committed()
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(id))
    }

    async fn get_transaction(&self, id: TransactionId) -> StoreResult<TransactionRecord> {
        self.read_committed()
            .transactions
            .get(&id)
            .cloned()
            .ok_or(StoreError::TransactionNotFound(id))
    }
}

/// Unit of work over a [`MemoryStore`]
///
/// Row guards and staged writes live here; dropping it releases the locks
/// and discards the writes.
pub struct MemoryUnitOfWork {
    store: MemoryStore,
    held: HashMap<AccountId, OwnedMutexGuard<()>>,
    staged_accounts: HashMap<AccountId, Account>,
    staged_transactions: Vec<TransactionRecord>,
}

impl MemoryUnitOfWork {
    fn current(&self, id: AccountId) -> StoreResult<Account> {
        if let Some(account) = self.staged_accounts.get(&id) {
            return Ok(account.clone());
        }
        self.store
            .read_committed()
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(id))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn get_for_update(&mut self, id: AccountId) -> StoreResult<Account> {
        if !self.held.contains_key(&id) {
            let lock = self.store.row_lock(id)?;
            let guard = tokio::time::timeout(self.store.inner.lock_timeout, lock.lock_owned())
                .await
                .map_err(|_| StoreError::LockTimeout(id))?;
            self.held.insert(id, guard);
        }

        self.current(id)
    }

    async fn set_balance(&mut self, id: AccountId, balance: Balance) -> StoreResult<()> {
        #[cfg(test)]
        self.store.trip(FailPoint::SetBalance)?;

        // UPDATE takes the row lock implicitly when the caller has not
        let account = self.get_for_update(id).await?;
        self.staged_accounts.insert(id, account.with_balance(balance));
        Ok(())
    }

    async fn append(&mut self, transaction: &NewTransaction) -> StoreResult<TransactionId> {
        #[cfg(test)]
        self.store.trip(FailPoint::Append)?;

        // Like a database sequence, ids consumed by rolled-back units leave gaps
        let id = TransactionId::new(
            self.store
                .inner
                .next_transaction_id
                .fetch_add(1, Ordering::SeqCst),
        );
        self.staged_transactions
            .push(transaction.clone().into_record(id));
        Ok(id)
    }

    async fn commit(mut self) -> StoreResult<()> {
        #[cfg(test)]
        self.store.trip(FailPoint::Commit)?;

        let mut committed = self.store.write_committed();
        for (id, account) in self.staged_accounts.drain() {
            committed.accounts.insert(id, account);
        }
        for record in self.staged_transactions.drain(..) {
            committed.transactions.insert(record.id, record);
        }
        drop(committed);

        // Row guards are released only after the writes are visible
        self.held.clear();
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}
