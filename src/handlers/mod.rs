//! Command Handlers module
//!
//! Handlers that orchestrate ledger operations over a [`LedgerStore`](crate::store::LedgerStore).

mod account_handler;
mod commands;
mod state;
mod transfer_handler;

#[cfg(test)]
mod tests;

pub use account_handler::AccountHandler;
pub use commands::*;
pub use state::TransferState;
pub use transfer_handler::{lock_order, TransferHandler};
