//! Transfer Handler
//!
//! Moves funds between two accounts inside one unit of work: validate,
//! lock both rows, re-check funds, write both balances and the transaction
//! record, commit. Any failure after the unit opens rolls all of it back.

use tracing::{debug, error, info, warn};

use crate::domain::validation::{
    check_distinct_accounts, check_sufficient_funds, parse_transfer_amount,
};
use crate::domain::{
    AccountId, Amount, Balance, LedgerError, NewTransaction, TransactionId, TransactionRecord,
    TransactionStatus,
};
use crate::store::{LedgerStore, UnitOfWork};

use super::{TransferCommand, TransferReceipt, TransferState};

/// Handler for transfers between accounts
#[derive(Debug, Clone)]
pub struct TransferHandler<S> {
    store: S,
}

/// Balances written by a successful Persisting step
struct Applied {
    transaction_id: TransactionId,
    source: Balance,
    destination: Balance,
}

impl<S: LedgerStore> TransferHandler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Execute the transfer command
    pub async fn execute(&self, command: TransferCommand) -> Result<TransferReceipt, LedgerError> {
        let mut state = TransferState::Validating;

        let validated = parse_transfer_amount(&command.amount).and_then(|amount| {
            check_distinct_accounts(command.source_account_id, command.destination_account_id)
                .map(|_| amount)
        });
        let amount = match validated {
            Ok(amount) => amount,
            Err(e) => return Err(abort(&mut state, &command, e)),
        };

        advance(&mut state, TransferState::Locking, &command);
        let mut unit = match self.store.begin().await {
            Ok(unit) => unit,
            Err(e) => return Err(abort(&mut state, &command, e.into())),
        };

        let applied = match apply(&mut unit, &command, amount, &mut state).await {
            Ok(applied) => applied,
            Err(e) => {
                if let Err(rollback_err) = unit.rollback().await {
                    // The unit is dropped either way, which releases it server-side
                    warn!(error = %rollback_err, "Rollback failed");
                }
                return Err(abort(&mut state, &command, e));
            }
        };

        if let Err(e) = unit.commit().await {
            return Err(abort(&mut state, &command, e.into()));
        }
        advance(&mut state, TransferState::Committed, &command);

        info!(
            transaction_id = %applied.transaction_id,
            source = %command.source_account_id,
            destination = %command.destination_account_id,
            amount = %amount,
            "Transfer committed"
        );

        Ok(TransferReceipt {
            transaction_id: applied.transaction_id,
            source_account_id: command.source_account_id,
            destination_account_id: command.destination_account_id,
            amount,
            status: TransactionStatus::Success,
            state,
            source_balance: applied.source,
            destination_balance: applied.destination,
        })
    }

    /// Read back a committed transaction record
    pub async fn get_transaction(&self, id: TransactionId) -> Result<TransactionRecord, LedgerError> {
        Ok(self.store.get_transaction(id).await?)
    }
}

/// Locking, Computing and Persisting, all inside `unit`
async fn apply<U: UnitOfWork>(
    unit: &mut U,
    command: &TransferCommand,
    amount: Amount,
    state: &mut TransferState,
) -> Result<Applied, LedgerError> {
    let source_id = command.source_account_id;
    let destination_id = command.destination_account_id;

    // Rows are always locked in ascending id order, so two transfers running
    // in opposite directions over the same pair cannot deadlock.
    let (first, second) = lock_order(source_id, destination_id);
    let first_account = unit.get_for_update(first).await?;
    let second_account = unit.get_for_update(second).await?;
    let (source, destination) = if first == source_id {
        (first_account, second_account)
    } else {
        (second_account, first_account)
    };

    advance(state, TransferState::Computing, command);

    // Balances read before the locks may be stale; only this check counts
    check_sufficient_funds(&source.balance, &amount)?;
    let new_source = source
        .balance
        .debit(&amount)
        .map_err(|_| LedgerError::insufficient_funds(amount, source.balance))?;
    let new_destination = destination
        .balance
        .credit(&amount)
        .map_err(|_| LedgerError::BalanceOverflow(destination_id))?;

    advance(state, TransferState::Persisting, command);

    unit.set_balance(source_id, new_source).await?;
    unit.set_balance(destination_id, new_destination).await?;
    let transaction_id = unit
        .append(&NewTransaction::success(source_id, destination_id, amount))
        .await?;

    Ok(Applied {
        transaction_id,
        source: new_source,
        destination: new_destination,
    })
}

/// Canonical lock order for a pair of accounts
pub fn lock_order(a: AccountId, b: AccountId) -> (AccountId, AccountId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn advance(state: &mut TransferState, next: TransferState, command: &TransferCommand) {
    debug_assert!(state.can_transition_to(next), "{state} -> {next}");
    debug!(
        source = %command.source_account_id,
        destination = %command.destination_account_id,
        from = %state,
        to = %next,
        "Transfer state transition"
    );
    *state = next;
}

fn abort(state: &mut TransferState, command: &TransferCommand, err: LedgerError) -> LedgerError {
    let from = *state;
    let rolled_back = from.holds_unit_of_work();
    advance(state, TransferState::Aborted, command);

    if matches!(err, LedgerError::Persistence(_)) {
        error!(
            source = %command.source_account_id,
            destination = %command.destination_account_id,
            amount = %command.amount,
            from = %from,
            rolled_back,
            error = %err,
            "Transfer aborted"
        );
    } else {
        warn!(
            source = %command.source_account_id,
            destination = %command.destination_account_id,
            amount = %command.amount,
            from = %from,
            rolled_back,
            error = %err,
            "Transfer aborted"
        );
    }

    err
}
