//! Transfer states
//!
//! `Validating -> Locking -> Computing -> Persisting -> Committed`, with
//! `Aborted` reachable from every non-terminal state.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Validating,
    Locking,
    Computing,
    Persisting,
    Committed,
    Aborted,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Committed | TransferState::Aborted)
    }

    /// Whether `self -> next` is a legal step
    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;

        match (self, next) {
            (Validating, Locking) | (Locking, Computing) | (Computing, Persisting) => true,
            (Persisting, Committed) => true,
            (from, Aborted) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Whether a unit of work is open in this state
    pub fn holds_unit_of_work(&self) -> bool {
        matches!(
            self,
            TransferState::Locking | TransferState::Computing | TransferState::Persisting
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferState::Validating => "VALIDATING",
            TransferState::Locking => "LOCKING",
            TransferState::Computing => "COMPUTING",
            TransferState::Persisting => "PERSISTING",
            TransferState::Committed => "COMMITTED",
            TransferState::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}
