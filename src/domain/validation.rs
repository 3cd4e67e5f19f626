//! Request validation
//!
//! Pure checks run on raw requests and on freshly locked balances.
//! None of these touch storage.

use super::{AccountId, Amount, Balance, LedgerError};

/// Parse an initial balance: any non-negative decimal with at most 5 fractional digits.
pub fn parse_initial_balance(raw: &str) -> Result<Balance, LedgerError> {
    raw.parse::<Balance>()
        .map_err(|e| LedgerError::InvalidAmount(format!("initial_balance: {e}")))
}

/// Parse a transfer amount: a strictly positive decimal with at most 5 fractional digits.
pub fn parse_transfer_amount(raw: &str) -> Result<Amount, LedgerError> {
    raw.parse::<Amount>()
        .map_err(|e| LedgerError::InvalidAmount(format!("amount: {e}")))
}

pub fn check_distinct_accounts(
    source: AccountId,
    destination: AccountId,
) -> Result<(), LedgerError> {
    if source == destination {
        return Err(LedgerError::SameAccount);
    }
    Ok(())
}

pub fn check_sufficient_funds(balance: &Balance, amount: &Amount) -> Result<(), LedgerError> {
    if !balance.is_sufficient_for(amount) {
        return Err(LedgerError::insufficient_funds(*amount, *balance));
    }
    Ok(())
}
