//! Transaction records
//!
//! Immutable log entries written once per committed transfer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{AccountId, Amount};

/// Store-assigned, monotonically increasing transaction id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

impl TransactionId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Transaction status
///
/// Only `Success` is written today; `Failed` is reserved for asynchronous
/// settlement and never produced by the transfer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Success => "Success",
            TransactionStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TransactionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Success" => Ok(TransactionStatus::Success),
            "Failed" => Ok(TransactionStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Transaction about to be appended; the id is assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl NewTransaction {
    pub fn success(source: AccountId, destination: AccountId, amount: Amount) -> Self {
        Self {
            source_account_id: source,
            destination_account_id: destination,
            amount,
            status: TransactionStatus::Success,
            created_at: Utc::now(),
        }
    }

    pub fn into_record(self, id: TransactionId) -> TransactionRecord {
        TransactionRecord {
            id,
            source_account_id: self.source_account_id,
            destination_account_id: self.destination_account_id,
            amount: self.amount,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Committed transaction record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}
