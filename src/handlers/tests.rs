//! Handler tests
//!
//! Exercise the account lifecycle and the transfer engine against the
//! in-memory store, including concurrent transfers and injected failures.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal_macros::dec;
    use tokio_test::{assert_err, assert_ok};

    use crate::domain::{AccountId, LedgerError, TransactionStatus};
    use crate::handlers::{
        AccountHandler, CreateAccountCommand, TransferCommand, TransferHandler, TransferState,
    };
    use crate::store::{FailPoint, LedgerStore, MemoryStore, UnitOfWork};

    fn id(value: i64) -> AccountId {
        AccountId::new(value).unwrap()
    }

    async fn ledger_with(accounts: &[(i64, &str)]) -> MemoryStore {
        let store = MemoryStore::new();
        let handler = AccountHandler::new(store.clone());
        for (account_id, balance) in accounts {
            handler
                .create(CreateAccountCommand::new(id(*account_id), *balance))
                .await
                .unwrap();
        }
        store
    }

    async fn balance_of(store: &MemoryStore, account_id: i64) -> String {
        store
            .get_account(id(account_id))
            .await
            .unwrap()
            .balance
            .to_string()
    }

    // =========================================================================
    // Account lifecycle
    // =========================================================================

    #[tokio::test]
    async fn test_create_account() {
        let store = MemoryStore::new();
        let handler = AccountHandler::new(store.clone());

        let account = assert_ok!(
            handler
                .create(CreateAccountCommand::new(id(1), "100.00000"))
                .await
        );
        assert_eq!(account.id, id(1));
        assert_eq!(account.balance.to_string(), "100.00000");

        let fetched = handler.get(id(1)).await.unwrap();
        assert_eq!(fetched, account);
    }

    #[tokio::test]
    async fn test_create_account_invalid_balance() {
        let handler = AccountHandler::new(MemoryStore::new());

        for raw in ["-1.00000", "abc", "1.000001"] {
            let result = handler.create(CreateAccountCommand::new(id(1), raw)).await;
            assert!(
                matches!(result, Err(LedgerError::InvalidAmount(_))),
                "expected InvalidAmount for {raw:?}"
            );
        }
        assert!(handler.get(id(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_create_duplicate_account_keeps_balance() {
        let store = ledger_with(&[(1, "100.00000")]).await;
        let handler = AccountHandler::new(store.clone());

        let result = handler
            .create(CreateAccountCommand::new(id(1), "5.00000"))
            .await;
        assert_eq!(result.unwrap_err(), LedgerError::AlreadyExists(id(1)));
        assert_eq!(balance_of(&store, 1).await, "100.00000");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_same_id_only_one_wins() {
        let store = MemoryStore::new();
        let handler = AccountHandler::new(store.clone());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler
                        .create(CreateAccountCommand::new(id(7), format!("{i}")))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert_eq!(e, LedgerError::AlreadyExists(id(7))),
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_get_missing_account() {
        let handler = AccountHandler::new(MemoryStore::new());
        assert_eq!(handler.get(id(42)).await.unwrap_err(), LedgerError::NotFound(id(42)));
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    #[tokio::test]
    async fn test_transfer_moves_funds() {
        let store = ledger_with(&[(1, "100.00000"), (2, "0.00000")]).await;
        let handler = TransferHandler::new(store.clone());

        let receipt = handler
            .execute(TransferCommand::new(id(1), id(2), "30.00000"))
            .await
            .unwrap();

        assert_eq!(receipt.status, TransactionStatus::Success);
        assert_eq!(receipt.state, TransferState::Committed);
        assert_eq!(receipt.amount.to_string(), "30.00000");
        assert_eq!(receipt.source_balance.to_string(), "70.00000");
        assert_eq!(receipt.destination_balance.to_string(), "30.00000");

        assert_eq!(balance_of(&store, 1).await, "70.00000");
        assert_eq!(balance_of(&store, 2).await, "30.00000");
        assert_eq!(store.total_balance(), dec!(100));

        let record = handler.get_transaction(receipt.transaction_id).await.unwrap();
        assert_eq!(record.source_account_id, id(1));
        assert_eq!(record.destination_account_id, id(2));
        assert_eq!(record.amount, receipt.amount);
        assert_eq!(record.status, TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_transfer_refreshes_updated_at() {
        let store = ledger_with(&[(1, "10"), (2, "0")]).await;
        let before = store.get_account(id(1)).await.unwrap();

        TransferHandler::new(store.clone())
            .execute(TransferCommand::new(id(1), id(2), "1"))
            .await
            .unwrap();

        let after = store.get_account(id(1)).await.unwrap();
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn test_transfer_entire_balance() {
        let store = ledger_with(&[(1, "12.34567"), (2, "0")]).await;

        TransferHandler::new(store.clone())
            .execute(TransferCommand::new(id(1), id(2), "12.34567"))
            .await
            .unwrap();

        assert_eq!(balance_of(&store, 1).await, "0.00000");
        assert_eq!(balance_of(&store, 2).await, "12.34567");
    }

    #[tokio::test]
    async fn test_transfer_from_higher_to_lower_id() {
        let store = ledger_with(&[(1, "0"), (2, "50")]).await;

        TransferHandler::new(store.clone())
            .execute(TransferCommand::new(id(2), id(1), "20"))
            .await
            .unwrap();

        assert_eq!(balance_of(&store, 1).await, "20.00000");
        assert_eq!(balance_of(&store, 2).await, "30.00000");
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balances_unchanged() {
        let store = ledger_with(&[(1, "70.00000"), (2, "30.00000")]).await;
        let handler = TransferHandler::new(store.clone());

        let err = assert_err!(
            handler
                .execute(TransferCommand::new(id(1), id(2), "1000.00000"))
                .await
        );
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        assert_eq!(balance_of(&store, 1).await, "70.00000");
        assert_eq!(balance_of(&store, 2).await, "30.00000");
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_same_account_writes_nothing() {
        let store = ledger_with(&[(1, "100")]).await;
        let handler = TransferHandler::new(store.clone());

        let err = handler
            .execute(TransferCommand::new(id(1), id(1), "10"))
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::SameAccount);
        assert_eq!(balance_of(&store, 1).await, "100.00000");
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_amounts_rejected() {
        let store = ledger_with(&[(1, "100"), (2, "0")]).await;
        let handler = TransferHandler::new(store.clone());

        for raw in ["0", "-5", "abc", "", "0.000001", "1_0", " 5 ", "+5"] {
            let err = handler
                .execute(TransferCommand::new(id(1), id(2), raw))
                .await
                .unwrap_err();
            assert!(
                matches!(err, LedgerError::InvalidAmount(_)),
                "expected InvalidAmount for {raw:?}, got {err:?}"
            );
        }
        assert_eq!(store.total_balance(), dec!(100));
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_to_missing_account() {
        let store = ledger_with(&[(1, "100")]).await;
        let handler = TransferHandler::new(store.clone());

        let err = handler
            .execute(TransferCommand::new(id(1), id(9), "10"))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::NotFound(id(9)));

        let err = handler
            .execute(TransferCommand::new(id(8), id(1), "10"))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::NotFound(id(8)));

        assert_eq!(balance_of(&store, 1).await, "100.00000");
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_destination_overflow_rolls_back() {
        let store = ledger_with(&[(1, "10"), (2, "999999999999999")]).await;
        let handler = TransferHandler::new(store.clone());

        let err = handler
            .execute(TransferCommand::new(id(1), id(2), "5"))
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::BalanceOverflow(id(2)));
        assert_eq!(balance_of(&store, 1).await, "10.00000");
    }

    #[tokio::test]
    async fn test_missing_transaction() {
        let handler = TransferHandler::new(MemoryStore::new());
        let err = handler
            .get_transaction(crate::domain::TransactionId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::TransactionNotFound(_)));
    }

    // =========================================================================
    // Rollback on persistence failure
    // =========================================================================

    #[tokio::test]
    async fn test_failure_while_persisting_rolls_back_everything() {
        for point in [FailPoint::SetBalance, FailPoint::Append, FailPoint::Commit] {
            let store = ledger_with(&[(1, "100"), (2, "0")]).await;
            let handler = TransferHandler::new(store.clone());
            store.fail_next(point);

            let err = handler
                .execute(TransferCommand::new(id(1), id(2), "30"))
                .await
                .unwrap_err();
            assert!(
                matches!(err, LedgerError::Persistence(_)),
                "{point:?}: expected Persistence, got {err:?}"
            );

            assert_eq!(balance_of(&store, 1).await, "100.00000", "{point:?}");
            assert_eq!(balance_of(&store, 2).await, "0.00000", "{point:?}");
            assert!(store.transactions().is_empty(), "{point:?}");

            // Locks were released: the next transfer goes through
            handler
                .execute(TransferCommand::new(id(1), id(2), "30"))
                .await
                .unwrap();
            assert_eq!(balance_of(&store, 1).await, "70.00000");
        }
    }

    #[tokio::test]
    async fn test_lock_timeout_surfaces_as_persistence_failure() {
        let store = MemoryStore::with_lock_timeout(Duration::from_millis(50));
        let accounts = AccountHandler::new(store.clone());
        accounts.create(CreateAccountCommand::new(id(1), "100")).await.unwrap();
        accounts.create(CreateAccountCommand::new(id(2), "0")).await.unwrap();

        // Another unit of work sits on account 2
        let mut blocker = store.begin().await.unwrap();
        blocker.get_for_update(id(2)).await.unwrap();

        let err = TransferHandler::new(store.clone())
            .execute(TransferCommand::new(id(1), id(2), "10"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Persistence(_)));

        blocker.rollback().await.unwrap();
        assert_eq!(balance_of(&store, 1).await, "100.00000");
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_conserve_funds() {
        const N: usize = 50;
        let store = ledger_with(&[(1, "500.00000"), (2, "25.00000")]).await;
        let handler = Arc::new(TransferHandler::new(store.clone()));

        let tasks: Vec<_> = (0..N)
            .map(|_| {
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler
                        .execute(TransferCommand::new(id(1), id(2), "10.00000"))
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(balance_of(&store, 1).await, "0.00000");
        assert_eq!(balance_of(&store, 2).await, "525.00000");

        let records = store.transactions();
        assert_eq!(records.len(), N);
        assert!(records.iter().all(|r| r.status == TransactionStatus::Success));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_overdraw_attempts_never_go_negative() {
        let store = ledger_with(&[(1, "10.00000"), (2, "0.00000")]).await;
        let handler = Arc::new(TransferHandler::new(store.clone()));

        let tasks: Vec<_> = (0..25)
            .map(|_| {
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler
                        .execute(TransferCommand::new(id(1), id(2), "1.00000"))
                        .await
                })
            })
            .collect();

        let mut succeeded = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(e) => assert!(matches!(e, LedgerError::InsufficientFunds { .. })),
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(balance_of(&store, 1).await, "0.00000");
        assert_eq!(balance_of(&store, 2).await, "10.00000");
        assert_eq!(store.transactions().len(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reciprocal_transfers_do_not_deadlock() {
        let store = ledger_with(&[(1, "1000"), (2, "1000"), (3, "1000")]).await;
        let handler = Arc::new(TransferHandler::new(store.clone()));

        let pairs = [(1, 2), (2, 1), (2, 3), (3, 2), (3, 1), (1, 3)];
        let tasks: Vec<_> = (0..60)
            .map(|i| {
                let handler = handler.clone();
                let (from, to) = pairs[i % pairs.len()];
                tokio::spawn(async move {
                    handler
                        .execute(TransferCommand::new(id(from), id(to), "3.33333"))
                        .await
                })
            })
            .collect();

        let all = async {
            for task in tasks {
                task.await.unwrap().unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(10), all)
            .await
            .expect("transfers deadlocked");

        // Every pair ran equally often in both directions
        assert_eq!(store.total_balance(), dec!(3000));
        for account in 1..=3 {
            assert_eq!(balance_of(&store, account).await, "1000.00000");
        }
        assert_eq!(store.transactions().len(), 60);
    }
}
