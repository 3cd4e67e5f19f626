//! Account Handler
//!
//! Account creation and lookup. Bypasses the transfer engine and talks to
//! the store directly.

use crate::domain::validation::parse_initial_balance;
use crate::domain::{Account, AccountId, LedgerError};
use crate::store::LedgerStore;

use super::CreateAccountCommand;

/// Handler for account lifecycle operations
#[derive(Debug, Clone)]
pub struct AccountHandler<S> {
    store: S,
}

impl<S: LedgerStore> AccountHandler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Open a new account with its initial balance
    pub async fn create(&self, command: CreateAccountCommand) -> Result<Account, LedgerError> {
        let initial_balance = parse_initial_balance(&command.initial_balance)?;

        // Fast path only: a concurrent create can still slip in between this
        // read and the insert, and the insert's uniqueness check decides.
        match self.store.get_account(command.account_id).await {
            Ok(_) => {
                tracing::info!(account_id = %command.account_id, "Account already exists");
                return Err(LedgerError::AlreadyExists(command.account_id));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let account = self
            .store
            .create_account(command.account_id, initial_balance)
            .await?;

        tracing::info!(
            account_id = %account.id,
            balance = %account.balance,
            "Account created"
        );

        Ok(account)
    }

    /// Current committed snapshot of an account
    pub async fn get(&self, id: AccountId) -> Result<Account, LedgerError> {
        Ok(self.store.get_account(id).await?)
    }
}
