//! PostgreSQL Ledger Store
//!
//! `accounts` and `transactions` tables accessed through sqlx.
//! Row locks are `SELECT ... FOR UPDATE` inside a database transaction.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::transaction::UnknownStatus;
use crate::domain::{
    Account, AccountId, Amount, Balance, NewTransaction, TransactionId, TransactionRecord,
};

use super::{LedgerStore, StoreError, StoreResult, UnitOfWork};

/// SQLSTATE raised when `lock_timeout` expires
const LOCK_NOT_AVAILABLE: &str = "55P03";

type AccountRow = (i64, Decimal, DateTime<Utc>, DateTime<Utc>);
type TransactionRow = (i64, i64, i64, Decimal, String, DateTime<Utc>);

/// Ledger store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgStore {
    /// Create a new PgStore with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: Duration::from_secs(5),
        }
    }

    /// Bound how long `get_for_update` may wait for a row lock
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_account(row: AccountRow) -> StoreResult<Account> {
    let (account_id, balance, created_at, updated_at) = row;
    let id = AccountId::new(account_id).map_err(|e| StoreError::InvalidData(e.to_string()))?;
    let balance = Balance::new(balance)
        .map_err(|e| StoreError::InvalidData(format!("account {id}: {e}")))?;

    Ok(Account {
        id,
        balance,
        created_at,
        updated_at,
    })
}

fn row_to_transaction(row: TransactionRow) -> StoreResult<TransactionRecord> {
    let (id, source, destination, amount, status, created_at) = row;
    let invalid = |e: String| StoreError::InvalidData(format!("transaction {id}: {e}"));

    Ok(TransactionRecord {
        id: TransactionId::new(id),
        source_account_id: AccountId::new(source).map_err(|e| invalid(e.to_string()))?,
        destination_account_id: AccountId::new(destination)
            .map_err(|e| invalid(e.to_string()))?,
        amount: Amount::new(amount).map_err(|e| invalid(e.to_string()))?,
        status: status
            .parse()
            .map_err(|e: UnknownStatus| invalid(e.to_string()))?,
        created_at,
    })
}

#[async_trait]
impl LedgerStore for PgStore {
    type Unit = PgUnitOfWork;

    async fn begin(&self) -> StoreResult<PgUnitOfWork> {
        let mut tx = self.pool.begin().await?;

        // SET cannot take bind parameters; the value is an integer we format ourselves
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;

        Ok(PgUnitOfWork { tx })
    }

    async fn create_account(&self, id: AccountId, initial_balance: Balance) -> StoreResult<Account> {
        let account = Account::open(id, initial_balance);

        let result = sqlx::query(
            r#"
            INSERT INTO accounts (account_id, balance, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id.value())
        .bind(initial_balance.value())
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(account),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::AccountExists(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_account(&self, id: AccountId) -> StoreResult<Account> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT account_id, balance, created_at, updated_at
            FROM accounts
            WHERE account_id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::AccountNotFound(id))
            .and_then(row_to_account)
    }

    async fn get_transaction(&self, id: TransactionId) -> StoreResult<TransactionRecord> {
        let row: Option<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, source_account_id, destination_account_id, amount, status, created_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::TransactionNotFound(id))
            .and_then(row_to_transaction)
    }
}

/// Database transaction holding the row locks of one transfer
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn get_for_update(&mut self, id: AccountId) -> StoreResult<Account> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT account_id, balance, created_at, updated_at
            FROM accounts
            WHERE account_id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) =>
            {
                StoreError::LockTimeout(id)
            }
            other => StoreError::Database(other),
        })?;

        row.ok_or(StoreError::AccountNotFound(id))
            .and_then(row_to_account)
    }

    async fn set_balance(&mut self, id: AccountId, balance: Balance) -> StoreResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $1, updated_at = NOW()
            WHERE account_id = $2
            "#,
        )
        .bind(balance.value())
        .bind(id.value())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::AccountNotFound(id));
        }

        Ok(())
    }

    async fn append(&mut self, transaction: &NewTransaction) -> StoreResult<TransactionId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (source_account_id, destination_account_id, amount, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(transaction.source_account_id.value())
        .bind(transaction.destination_account_id.value())
        .bind(transaction.amount.value())
        .bind(transaction.status.as_str())
        .bind(transaction.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(TransactionId::new(id))
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
