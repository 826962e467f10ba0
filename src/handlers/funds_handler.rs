//! Deposit / withdraw handler
//!
//! Single-account balance operations over the store's atomic adjust
//! primitive. Amount rules are enforced by the `Amount` type, the same type
//! the transfer handler uses.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Account, Amount, DomainError};
use crate::error::{AppError, AppResult};
use crate::store::{AccountStore, StoreError};

const MAX_RETRIES: u32 = 3;

/// Handler for deposits and withdrawals
pub struct FundsHandler {
    store: Arc<dyn AccountStore>,
}

impl FundsHandler {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Credit `amount` to the account and return the updated record.
    pub async fn deposit(&self, account_id: i64, amount: &str) -> AppResult<Account> {
        let amount = parse_amount(amount)?;

        // Existence check up front so a missing account is reported as the
        // business outcome rather than a bare store failure.
        self.load(account_id).await?;

        match self.store.adjust_balance(account_id, amount.value()).await {
            Ok(balance) => {
                tracing::info!(account_id, amount = %amount, balance = %balance, "deposit applied");
            }
            Err(StoreError::NotFound(id)) => return Err(DomainError::AccountNotFound(id).into()),
            Err(e) => return Err(e.into()),
        }

        self.load(account_id).await
    }

    /// Debit `amount` from the account and return the updated record.
    ///
    /// The sufficiency check reads the current balance; if a concurrent
    /// mutation invalidates that snapshot before the guarded decrement
    /// lands, validation re-runs against fresh state.
    pub async fn withdraw(&self, account_id: i64, amount: &str) -> AppResult<Account> {
        let amount = parse_amount(amount)?;

        for attempt in 0..MAX_RETRIES {
            let account = self.load(account_id).await?;
            if !account.balance.is_sufficient_for(&amount) {
                return Err(
                    DomainError::insufficient_funds(account_id, account.balance.value()).into(),
                );
            }

            match self.store.adjust_balance(account_id, -amount.value()).await {
                Ok(balance) => {
                    tracing::info!(account_id, amount = %amount, balance = %balance, "withdrawal applied");
                    return self.load(account_id).await;
                }
                Err(StoreError::Conflict { .. }) if attempt + 1 < MAX_RETRIES => {
                    tracing::warn!(
                        account_id,
                        "stale balance snapshot, revalidating (attempt {}/{})",
                        attempt + 1,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(Duration::from_millis(50 * (attempt as u64 + 1))).await;
                    continue;
                }
                Err(StoreError::NotFound(id)) => {
                    return Err(DomainError::AccountNotFound(id).into())
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(
            "withdrawal retry budget exhausted".to_string(),
        ))
    }

    async fn load(&self, account_id: i64) -> AppResult<Account> {
        match self.store.get(account_id).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound(id)) => Err(DomainError::AccountNotFound(id).into()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Parse and validate an operation amount: positive, at most two decimal
/// places. Shared by the API layer through this handler and the transfer
/// handler so the rules cannot diverge.
pub(crate) fn parse_amount(amount: &str) -> AppResult<Amount> {
    amount
        .parse()
        .map_err(|e: crate::domain::AmountError| DomainError::InvalidAmount(e.to_string()).into())
}
