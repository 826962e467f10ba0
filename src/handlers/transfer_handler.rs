//! Transfer handler
//!
//! The two-account money-movement core. Validation runs in a fixed order
//! (self-transfer, source existence, source active, funds, destination
//! existence, destination active) and the apply step moves both balances in
//! one atomic store unit. Business rejections are returned as values;
//! errors are reserved for infrastructure failures.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Account, Amount};
use crate::error::{AppError, AppResult};
use crate::store::{AccountStore, StoreError};

use super::funds_handler::parse_amount;
use super::{TransferCheck, TransferCommand, TransferOutcome, TransferRejection};

const MAX_RETRIES: u32 = 3;

/// Handler for transfers between two accounts
pub struct TransferHandler {
    store: Arc<dyn AccountStore>,
}

impl TransferHandler {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Pre-flight check: runs the full rule sequence without mutating
    /// anything. Shares the evaluation path with `execute`, so order and
    /// messages cannot drift.
    pub async fn validate(
        &self,
        source_account_id: i64,
        destination_account_id: i64,
        amount: &str,
    ) -> AppResult<TransferCheck> {
        let amount = parse_amount(amount)?;

        match self
            .evaluate(source_account_id, destination_account_id, &amount)
            .await?
        {
            Ok(_) => Ok(TransferCheck::valid()),
            Err(rejection) => Ok(TransferCheck::invalid(&rejection)),
        }
    }

    /// Execute a transfer. Either both balances change and are durable, or
    /// neither does. A stale validation snapshot detected at apply time
    /// re-runs validation against fresh state.
    pub async fn execute(&self, command: TransferCommand) -> AppResult<TransferOutcome> {
        let amount = parse_amount(&command.amount)?;

        for attempt in 0..MAX_RETRIES {
            let (source, destination) = match self
                .evaluate(
                    command.source_account_id,
                    command.destination_account_id,
                    &amount,
                )
                .await?
            {
                Ok(accounts) => accounts,
                Err(rejection) => {
                    tracing::info!(
                        source_account_id = command.source_account_id,
                        destination_account_id = command.destination_account_id,
                        code = rejection.code(),
                        "transfer rejected"
                    );
                    return Ok(TransferOutcome::Rejected(rejection));
                }
            };

            match self
                .store
                .transfer_balances(source.account_id, destination.account_id, amount.value())
                .await
            {
                Ok((source_balance, destination_balance)) => {
                    tracing::info!(
                        source_account_id = source.account_id,
                        destination_account_id = destination.account_id,
                        amount = %amount,
                        "transfer completed"
                    );
                    return Ok(TransferOutcome::Completed {
                        source_account_id: source.account_id,
                        destination_account_id: destination.account_id,
                        source_balance,
                        destination_balance,
                        kind: command.kind,
                    });
                }
                // Stale snapshot or an account deleted underneath us:
                // revalidate from the top so the rejection (if any) comes
                // out in rule order.
                Err(StoreError::Conflict { .. }) | Err(StoreError::NotFound(_))
                    if attempt + 1 < MAX_RETRIES =>
                {
                    tracing::warn!(
                        source_account_id = source.account_id,
                        destination_account_id = destination.account_id,
                        "transfer apply conflicted, revalidating (attempt {}/{})",
                        attempt + 1,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(Duration::from_millis(50 * (attempt as u64 + 1))).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(
            "transfer retry budget exhausted".to_string(),
        ))
    }

    /// Steps 1-6: first failing rule wins. `Err` inside the outer `Ok` is a
    /// business rejection; the outer `Err` is an infrastructure failure.
    async fn evaluate(
        &self,
        source_account_id: i64,
        destination_account_id: i64,
        amount: &Amount,
    ) -> AppResult<Result<(Account, Account), TransferRejection>> {
        if source_account_id == destination_account_id {
            return Ok(Err(TransferRejection::SameAccount));
        }

        let source = match self.store.get(source_account_id).await {
            Ok(account) => account,
            Err(StoreError::NotFound(account_id)) => {
                return Ok(Err(TransferRejection::SourceAccountNotFound { account_id }))
            }
            Err(e) => return Err(e.into()),
        };

        if !source.active {
            return Ok(Err(TransferRejection::SourceAccountInactive {
                account_id: source_account_id,
            }));
        }

        if !source.balance.is_sufficient_for(amount) {
            return Ok(Err(TransferRejection::InsufficientFunds {
                account_id: source_account_id,
                available: source.balance.value(),
            }));
        }

        let destination = match self.store.get(destination_account_id).await {
            Ok(account) => account,
            Err(StoreError::NotFound(account_id)) => {
                return Ok(Err(TransferRejection::DestinationAccountNotFound {
                    account_id,
                }))
            }
            Err(e) => return Err(e.into()),
        };

        if !destination.active {
            return Ok(Err(TransferRejection::DestinationAccountInactive {
                account_id: destination_account_id,
            }));
        }

        Ok(Ok((source, destination)))
    }
}
