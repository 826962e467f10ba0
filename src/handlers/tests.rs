//! Handler tests
//!
//! Exercise the lifecycle, funds and transfer handlers against the
//! in-memory store with stubbed boundary collaborators.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use crate::adapter::{AccountNumberGenerator, CustomerDirectory, CustomerValidation};
    use crate::domain::{Account, AccountType, Balance, DomainError, NewAccount};
    use crate::error::AppError;
    use crate::handlers::{
        AccountHandler, CreateAccountCommand, FundsHandler, TransferCommand, TransferHandler,
        TransferKind, TransferOutcome, TransferRejection,
    };
    use crate::store::{AccountStore, MemoryAccountStore};

    /// Directory stub with a fixed answer
    struct StubCustomerDirectory {
        exists: bool,
        active: bool,
        unreachable: bool,
    }

    impl StubCustomerDirectory {
        fn ok() -> Self {
            Self {
                exists: true,
                active: true,
                unreachable: false,
            }
        }

        fn missing() -> Self {
            Self {
                exists: false,
                active: false,
                unreachable: false,
            }
        }

        fn inactive() -> Self {
            Self {
                exists: true,
                active: false,
                unreachable: false,
            }
        }

        fn unreachable() -> Self {
            Self {
                exists: false,
                active: false,
                unreachable: true,
            }
        }
    }

    #[async_trait]
    impl CustomerDirectory for StubCustomerDirectory {
        async fn validate(&self, _customer_id: i64) -> Result<CustomerValidation, DomainError> {
            if self.unreachable {
                return Err(DomainError::ExternalServiceUnavailable(
                    "connection refused".to_string(),
                ));
            }
            Ok(CustomerValidation {
                exists: self.exists,
                active: self.active,
                message: None,
            })
        }
    }

    /// Deterministic number sequence that also counts how many numbers were
    /// handed out.
    #[derive(Default)]
    struct CountingNumberGenerator {
        issued: AtomicI64,
    }

    impl CountingNumberGenerator {
        fn issued(&self) -> i64 {
            self.issued.load(Ordering::SeqCst)
        }
    }

    impl AccountNumberGenerator for CountingNumberGenerator {
        fn generate(&self) -> String {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            format!("ACC-TEST{n:016}")
        }
    }

    fn store() -> Arc<MemoryAccountStore> {
        Arc::new(MemoryAccountStore::new())
    }

    fn lifecycle(
        store: &Arc<MemoryAccountStore>,
        directory: StubCustomerDirectory,
    ) -> AccountHandler {
        AccountHandler::new(
            store.clone(),
            Arc::new(directory),
            Arc::new(CountingNumberGenerator::default()),
        )
    }

    async fn seed_account(
        store: &Arc<MemoryAccountStore>,
        number: &str,
        balance: &str,
        customer_id: i64,
    ) -> Account {
        store
            .insert(NewAccount {
                account_number: number.to_string(),
                balance: balance.parse::<Balance>().unwrap(),
                account_type: AccountType::Savings,
                customer_id,
                active: true,
            })
            .await
            .unwrap()
    }

    async fn balance_of(store: &Arc<MemoryAccountStore>, account_id: i64) -> rust_decimal::Decimal {
        store.get(account_id).await.unwrap().balance.value()
    }

    // =========================================================================
    // Account creation
    // =========================================================================

    #[tokio::test]
    async fn test_create_account() {
        let store = store();
        let handler = lifecycle(&store, StubCustomerDirectory::ok());

        let account = handler
            .create(CreateAccountCommand::new(
                7,
                "250.00".to_string(),
                AccountType::Checking,
            ))
            .await
            .unwrap();

        assert!(account.active);
        assert_eq!(account.customer_id, 7);
        assert_eq!(account.account_type, AccountType::Checking);
        assert_eq!(account.balance.value(), dec!(250.00));
        assert!(account.account_number.starts_with("ACC-TEST"));
        assert_eq!(store.get(account.account_id).await.unwrap(), account);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_customer_without_consuming_a_number() {
        let store = store();
        let numbers = Arc::new(CountingNumberGenerator::default());
        let handler = AccountHandler::new(
            store.clone(),
            Arc::new(StubCustomerDirectory::missing()),
            numbers.clone(),
        );

        let err = handler
            .create(CreateAccountCommand::new(
                7,
                "0.00".to_string(),
                AccountType::Savings,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Domain(DomainError::CustomerNotFound(7))
        ));
        assert!(store.list_by_customer(7).await.unwrap().is_empty());
        assert_eq!(numbers.issued(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_inactive_customer() {
        let handler = lifecycle(&store(), StubCustomerDirectory::inactive());

        let err = handler
            .create(CreateAccountCommand::new(
                7,
                "0.00".to_string(),
                AccountType::Savings,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Domain(DomainError::CustomerInactive(7))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_negative_initial_balance() {
        let handler = lifecycle(&store(), StubCustomerDirectory::ok());

        let err = handler
            .create(CreateAccountCommand::new(
                7,
                "-10.00".to_string(),
                AccountType::Savings,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_create_surfaces_directory_outage_distinctly() {
        let handler = lifecycle(&store(), StubCustomerDirectory::unreachable());

        let err = handler
            .create(CreateAccountCommand::new(
                7,
                "0.00".to_string(),
                AccountType::Savings,
            ))
            .await
            .unwrap_err();

        // Never reported as CustomerNotFound.
        assert!(matches!(
            err,
            AppError::Domain(DomainError::ExternalServiceUnavailable(_))
        ));
    }

    // =========================================================================
    // Activate / deactivate / delete
    // =========================================================================

    #[tokio::test]
    async fn test_activate_is_idempotent() {
        let store = store();
        let handler = lifecycle(&store, StubCustomerDirectory::ok());
        let account = seed_account(&store, "ACC-A", "0.00", 1).await;

        let mut inactive = account.clone();
        inactive.active = false;
        store.save(&inactive).await.unwrap();

        let once = handler.activate(account.account_id).await.unwrap();
        assert!(once.active);

        let twice = handler.activate(account.account_id).await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_activate_missing_account() {
        let handler = lifecycle(&store(), StubCustomerDirectory::ok());

        let err = handler.activate(999).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::AccountNotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_deactivate_blocked_by_one_cent_then_allowed_at_zero() {
        let store = store();
        let handler = lifecycle(&store, StubCustomerDirectory::ok());
        let funds = FundsHandler::new(store.clone());
        let account = seed_account(&store, "ACC-A", "0.01", 1).await;

        let err = handler.deactivate(account.account_id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::PositiveBalance { .. })
        ));
        assert!(store.get(account.account_id).await.unwrap().active);

        funds.withdraw(account.account_id, "0.01").await.unwrap();

        let deactivated = handler.deactivate(account.account_id).await.unwrap();
        assert!(!deactivated.active);
    }

    #[tokio::test]
    async fn test_delete_blocked_by_positive_balance() {
        let store = store();
        let handler = lifecycle(&store, StubCustomerDirectory::ok());
        let account = seed_account(&store, "ACC-A", "10.00", 1).await;

        let err = handler.delete(account.account_id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::PositiveBalance { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_zero_balance_account() {
        let store = store();
        let handler = lifecycle(&store, StubCustomerDirectory::ok());
        let account = seed_account(&store, "ACC-A", "0.00", 1).await;

        handler.delete(account.account_id).await.unwrap();

        let err = handler.get_by_id(account.account_id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::AccountNotFound(_))
        ));
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[tokio::test]
    async fn test_get_by_customer_distinguishes_empty_from_found() {
        let store = store();
        let handler = lifecycle(&store, StubCustomerDirectory::ok());
        seed_account(&store, "ACC-A", "0.00", 1).await;
        seed_account(&store, "ACC-B", "0.00", 1).await;

        assert_eq!(handler.get_by_customer(1).await.unwrap().len(), 2);

        let err = handler.get_by_customer(2).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::CustomerAccountsNotFound(2))
        ));
    }

    #[tokio::test]
    async fn test_list_active_excludes_deactivated() {
        let store = store();
        let handler = lifecycle(&store, StubCustomerDirectory::ok());
        seed_account(&store, "ACC-A", "0.00", 1).await;
        let b = seed_account(&store, "ACC-B", "0.00", 1).await;

        handler.deactivate(b.account_id).await.unwrap();

        let active = handler.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].account_number, "ACC-A");
        assert!(handler.exists_active_for_customer(1).await.unwrap());
        assert!(!handler.exists_active(b.account_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_by_number() {
        let store = store();
        let handler = lifecycle(&store, StubCustomerDirectory::ok());
        let account = seed_account(&store, "ACC-A", "0.00", 1).await;

        assert_eq!(handler.get_by_number("ACC-A").await.unwrap(), account);

        let err = handler.get_by_number("ACC-MISSING").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::AccountNumberNotFound(_))
        ));
    }

    // =========================================================================
    // Deposit / withdraw
    // =========================================================================

    #[tokio::test]
    async fn test_deposit_increments_balance() {
        let store = store();
        let funds = FundsHandler::new(store.clone());
        let account = seed_account(&store, "ACC-A", "10.00", 1).await;

        let updated = funds.deposit(account.account_id, "5.50").await.unwrap();
        assert_eq!(updated.balance.value(), dec!(15.50));
    }

    #[tokio::test]
    async fn test_deposit_rejects_non_positive_amounts() {
        let store = store();
        let funds = FundsHandler::new(store.clone());
        let account = seed_account(&store, "ACC-A", "10.00", 1).await;

        for amount in ["0", "-5.00", "1.001", "abc"] {
            let err = funds.deposit(account.account_id, amount).await.unwrap_err();
            assert!(
                matches!(err, AppError::Domain(DomainError::InvalidAmount(_))),
                "amount {amount} should be invalid"
            );
        }
        assert_eq!(balance_of(&store, account.account_id).await, dec!(10.00));
    }

    #[tokio::test]
    async fn test_deposit_missing_account() {
        let funds = FundsHandler::new(store());

        let err = funds.deposit(999, "5.00").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::AccountNotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_withdraw_reports_current_balance_when_short() {
        let store = store();
        let funds = FundsHandler::new(store.clone());
        let account = seed_account(&store, "ACC-A", "50.00", 1).await;

        let err = funds.withdraw(account.account_id, "100.00").await.unwrap_err();
        match err {
            AppError::Domain(DomainError::InsufficientFunds { available, .. }) => {
                assert_eq!(available, dec!(50.00));
            }
            other => panic!("expected InsufficientFunds, got: {other:?}"),
        }
        assert_eq!(balance_of(&store, account.account_id).await, dec!(50.00));
    }

    #[tokio::test]
    async fn test_withdraw_exact_balance() {
        let store = store();
        let funds = FundsHandler::new(store.clone());
        let account = seed_account(&store, "ACC-A", "50.00", 1).await;

        let updated = funds.withdraw(account.account_id, "50.00").await.unwrap();
        assert_eq!(updated.balance.value(), dec!(0.00));
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    #[tokio::test]
    async fn test_transfer_moves_funds() {
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "1000.00", 1).await;
        let destination = seed_account(&store, "ACC-B", "500.00", 2).await;

        let outcome = transfers
            .execute(
                TransferCommand::new(
                    source.account_id,
                    destination.account_id,
                    "300.00".to_string(),
                )
                .with_kind(TransferKind::ThirdParty),
            )
            .await
            .unwrap();

        match outcome {
            TransferOutcome::Completed {
                source_balance,
                destination_balance,
                kind,
                ..
            } => {
                assert_eq!(source_balance, dec!(700.00));
                assert_eq!(destination_balance, dec!(800.00));
                assert_eq!(kind, TransferKind::ThirdParty);
            }
            other => panic!("expected completed transfer, got: {other:?}"),
        }

        assert_eq!(balance_of(&store, source.account_id).await, dec!(700.00));
        assert_eq!(balance_of(&store, destination.account_id).await, dec!(800.00));
    }

    #[tokio::test]
    async fn test_transfer_conserves_total() {
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "123.45", 1).await;
        let destination = seed_account(&store, "ACC-B", "0.55", 2).await;
        let total = dec!(124.00);

        let outcome = transfers
            .execute(TransferCommand::new(
                source.account_id,
                destination.account_id,
                "23.45".to_string(),
            ))
            .await
            .unwrap();

        assert!(outcome.is_success());
        let after = balance_of(&store, source.account_id).await
            + balance_of(&store, destination.account_id).await;
        assert_eq!(after, total);
    }

    #[tokio::test]
    async fn test_transfer_of_entire_balance() {
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "1000.00", 1).await;
        let destination = seed_account(&store, "ACC-B", "0.00", 2).await;

        let outcome = transfers
            .execute(TransferCommand::new(
                source.account_id,
                destination.account_id,
                "1000.00".to_string(),
            ))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(balance_of(&store, source.account_id).await, dec!(0.00));
        assert_eq!(balance_of(&store, destination.account_id).await, dec!(1000.00));
    }

    #[tokio::test]
    async fn test_transfer_to_missing_destination_changes_nothing() {
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "1000.00", 1).await;

        let outcome = transfers
            .execute(TransferCommand::new(
                source.account_id,
                999,
                "300.00".to_string(),
            ))
            .await
            .unwrap();

        match outcome {
            TransferOutcome::Rejected(rejection) => {
                assert_eq!(rejection.code(), "DESTINATION_ACCOUNT_NOT_FOUND");
                assert!(rejection.message().contains("999"));
            }
            other => panic!("expected rejection, got: {other:?}"),
        }
        assert_eq!(balance_of(&store, source.account_id).await, dec!(1000.00));
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds_reports_current_balance() {
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "50.00", 1).await;
        let destination = seed_account(&store, "ACC-B", "0.00", 2).await;

        let outcome = transfers
            .execute(TransferCommand::new(
                source.account_id,
                destination.account_id,
                "100.00".to_string(),
            ))
            .await
            .unwrap();

        match outcome {
            TransferOutcome::Rejected(TransferRejection::InsufficientFunds {
                available, ..
            }) => {
                assert_eq!(available, dec!(50.00));
            }
            other => panic!("expected insufficient funds, got: {other:?}"),
        }
        assert_eq!(balance_of(&store, source.account_id).await, dec!(50.00));
        assert_eq!(balance_of(&store, destination.account_id).await, dec!(0.00));
    }

    #[tokio::test]
    async fn test_transfer_to_self_rejected() {
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "100.00", 1).await;

        let outcome = transfers
            .execute(TransferCommand::new(
                source.account_id,
                source.account_id,
                "10.00".to_string(),
            ))
            .await
            .unwrap();

        match outcome {
            TransferOutcome::Rejected(rejection) => assert_eq!(rejection.code(), "SAME_ACCOUNT"),
            other => panic!("expected rejection, got: {other:?}"),
        }
        assert_eq!(balance_of(&store, source.account_id).await, dec!(100.00));
    }

    #[tokio::test]
    async fn test_transfer_from_inactive_source_rejected() {
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "0.00", 1).await;
        let destination = seed_account(&store, "ACC-B", "0.00", 2).await;

        let mut inactive = store.get(source.account_id).await.unwrap();
        inactive.active = false;
        store.save(&inactive).await.unwrap();

        let outcome = transfers
            .execute(TransferCommand::new(
                source.account_id,
                destination.account_id,
                "10.00".to_string(),
            ))
            .await
            .unwrap();

        match outcome {
            TransferOutcome::Rejected(rejection) => {
                assert_eq!(rejection.code(), "SOURCE_ACCOUNT_INACTIVE");
            }
            other => panic!("expected rejection, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transfer_to_inactive_destination_rejected() {
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "100.00", 1).await;
        let destination = seed_account(&store, "ACC-B", "0.00", 2).await;

        let mut inactive = store.get(destination.account_id).await.unwrap();
        inactive.active = false;
        store.save(&inactive).await.unwrap();

        let outcome = transfers
            .execute(TransferCommand::new(
                source.account_id,
                destination.account_id,
                "10.00".to_string(),
            ))
            .await
            .unwrap();

        match outcome {
            TransferOutcome::Rejected(rejection) => {
                assert_eq!(rejection.code(), "DESTINATION_ACCOUNT_INACTIVE");
            }
            other => panic!("expected rejection, got: {other:?}"),
        }
        assert_eq!(balance_of(&store, source.account_id).await, dec!(100.00));
    }

    #[tokio::test]
    async fn test_transfer_rule_order_funds_checked_before_destination() {
        // Source short AND destination missing: the funds rule fires first.
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "10.00", 1).await;

        let outcome = transfers
            .execute(TransferCommand::new(
                source.account_id,
                999,
                "100.00".to_string(),
            ))
            .await
            .unwrap();

        match outcome {
            TransferOutcome::Rejected(rejection) => {
                assert_eq!(rejection.code(), "INSUFFICIENT_FUNDS");
            }
            other => panic!("expected rejection, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transfer_rejects_invalid_amounts_as_errors() {
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "100.00", 1).await;
        let destination = seed_account(&store, "ACC-B", "0.00", 2).await;

        for amount in ["0", "-1.00", "10.001"] {
            let err = transfers
                .execute(TransferCommand::new(
                    source.account_id,
                    destination.account_id,
                    amount.to_string(),
                ))
                .await
                .unwrap_err();
            assert!(
                matches!(err, AppError::Domain(DomainError::InvalidAmount(_))),
                "amount {amount} should be invalid"
            );
        }
    }

    // =========================================================================
    // Pre-flight validation
    // =========================================================================

    #[tokio::test]
    async fn test_validate_matches_execute_and_mutates_nothing() {
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "50.00", 1).await;
        let destination = seed_account(&store, "ACC-B", "0.00", 2).await;

        let check = transfers
            .validate(source.account_id, destination.account_id, "100.00")
            .await
            .unwrap();
        assert!(!check.valid);
        assert_eq!(check.code.as_deref(), Some("INSUFFICIENT_FUNDS"));

        let outcome = transfers
            .execute(TransferCommand::new(
                source.account_id,
                destination.account_id,
                "100.00".to_string(),
            ))
            .await
            .unwrap();
        match outcome {
            TransferOutcome::Rejected(rejection) => {
                assert_eq!(Some(rejection.code()), check.code.as_deref());
                assert_eq!(Some(rejection.message()), check.message);
            }
            other => panic!("expected rejection, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validate_feasible_transfer_leaves_balances_untouched() {
        let store = store();
        let transfers = TransferHandler::new(store.clone());
        let source = seed_account(&store, "ACC-A", "100.00", 1).await;
        let destination = seed_account(&store, "ACC-B", "0.00", 2).await;

        let check = transfers
            .validate(source.account_id, destination.account_id, "100.00")
            .await
            .unwrap();
        assert!(check.valid);
        assert!(check.code.is_none());

        assert_eq!(balance_of(&store, source.account_id).await, dec!(100.00));
        assert_eq!(balance_of(&store, destination.account_id).await, dec!(0.00));
    }
}
