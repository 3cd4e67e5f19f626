//! Account model
//!
//! Account identity and the balance snapshot read from the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Balance;

/// Positive integer identifier of an account, immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct AccountId(i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountIdError {
    #[error("account_id must be a positive integer (got {0})")]
    NotPositive(i64),

    #[error("invalid account_id: {0}")]
    ParseError(String),
}

impl AccountId {
    pub fn new(value: i64) -> Result<Self, AccountIdError> {
        if value <= 0 {
            return Err(AccountIdError::NotPositive(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .parse()
            .map_err(|_| AccountIdError::ParseError(s.to_string()))?;
        AccountId::new(value)
    }
}

impl TryFrom<i64> for AccountId {
    type Error = AccountIdError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        AccountId::new(value)
    }
}

impl From<AccountId> for i64 {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

/// Account snapshot as stored in the ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Balance,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every balance mutation
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Fresh account with both timestamps set to now
    pub fn open(id: AccountId, balance: Balance) -> Self {
        let now = Utc::now();
        Self {
            id,
            balance,
            created_at: now,
            updated_at: now,
        }
    }

    /// Same account with a new balance and refreshed `updated_at`
    pub fn with_balance(&self, balance: Balance) -> Self {
        Self {
            balance,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
