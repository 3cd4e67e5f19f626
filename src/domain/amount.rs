//! Amount and Balance types
//!
//! Fixed-point monetary primitives. Every value is held as a `Decimal`
//! rescaled to exactly 5 fractional digits, so repeated credits and debits
//! never drift the way binary floating point would.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits carried by every amount and balance.
pub const SCALE: u32 = 5;

/// Exclusive upper bound of a NUMERIC(20,5) column (15 integer digits).
fn max_value() -> Decimal {
    Decimal::new(1_000_000_000_000_000, 0)
}

/// Errors that can occur when creating an Amount or a Balance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Balance cannot be negative (got {0})")]
    Negative(Decimal),

    #[error("Amount has too many decimal places (max {SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum storable value")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

/// Bring a raw decimal to the ledger scale, refusing to round away digits.
fn to_ledger_scale(value: Decimal) -> Result<Decimal, AmountError> {
    // "1.500000" is fine, "1.000001" is not
    if value.scale() > SCALE && value.normalize().scale() > SCALE {
        return Err(AmountError::TooManyDecimals(value.scale()));
    }

    if value.abs() >= max_value() {
        return Err(AmountError::Overflow);
    }

    let mut scaled = value;
    scaled.rescale(SCALE);
    Ok(scaled)
}

/// Plain decimal: optional `-`, digits, optional `.` followed by digits.
fn is_plain_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.map_or(true, all_digits)
}

fn parse_decimal(s: &str) -> Result<Decimal, AmountError> {
    if !is_plain_decimal(s) {
        return Err(AmountError::ParseError(format!("not a plain decimal: {s:?}")));
    }
    Decimal::from_str(s).map_err(|e| AmountError::ParseError(e.to_string()))
}

/// Amount represents a validated transfer value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Exactly 5 decimal places
/// - Below 10^15
///
/// # Example
/// ```
/// use transfer_ledger::domain::Amount;
///
/// let amount: Amount = "30".parse().unwrap();
/// assert_eq!(amount.to_string(), "30.00000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 5 significant decimal places
    /// - `AmountError::Overflow` if value >= 10^15
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        to_ledger_scale(value).map(Self)
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::new(parse_decimal(s)?)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

/// Balance represents an account balance (can be zero or positive).
/// Unlike Amount, Balance can be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Balance(Decimal);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::Negative(value));
        }

        to_ledger_scale(value).map(Self)
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(Decimal::new(0, SCALE))
    }

    /// Get the underlying value
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if balance covers the given amount
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 + amount.value())
    }

    /// Subtract amount from balance
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 - amount.value())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Balance {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Balance::new(parse_decimal(s)?)
    }
}

impl TryFrom<String> for Balance {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Balance::from_str(&value)
    }
}

impl From<Balance> for String {
    fn from(balance: Balance) -> Self {
        balance.to_string()
    }
}
