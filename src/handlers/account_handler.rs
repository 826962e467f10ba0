//! Account lifecycle handler
//!
//! Create, activate, deactivate and delete single accounts, plus the read
//! operations. Rules here depend on one account and the customer directory
//! only; two-account rules live in the transfer handler.

use std::sync::Arc;

use crate::adapter::{AccountNumberGenerator, CustomerDirectory};
use crate::domain::{Account, Balance, DomainError, NewAccount};
use crate::error::{AppError, AppResult};
use crate::store::{AccountStore, StoreError};

use super::CreateAccountCommand;

/// Attempts to find an unused account number before giving up.
const MAX_NUMBER_ATTEMPTS: u32 = 3;

/// Handler for account lifecycle operations
pub struct AccountHandler {
    store: Arc<dyn AccountStore>,
    customers: Arc<dyn CustomerDirectory>,
    numbers: Arc<dyn AccountNumberGenerator>,
}

impl AccountHandler {
    pub fn new(
        store: Arc<dyn AccountStore>,
        customers: Arc<dyn CustomerDirectory>,
        numbers: Arc<dyn AccountNumberGenerator>,
    ) -> Self {
        Self {
            store,
            customers,
            numbers,
        }
    }

    /// Open a new account. The customer is validated first; a rejected
    /// create consumes no account number.
    pub async fn create(&self, command: CreateAccountCommand) -> AppResult<Account> {
        let initial_balance: Balance = command
            .initial_balance
            .parse()
            .map_err(|e: crate::domain::AmountError| DomainError::InvalidAmount(e.to_string()))?;

        let validation = self.customers.validate(command.customer_id).await?;
        if !validation.exists {
            return Err(DomainError::CustomerNotFound(command.customer_id).into());
        }
        if !validation.active {
            return Err(DomainError::CustomerInactive(command.customer_id).into());
        }

        for attempt in 0..MAX_NUMBER_ATTEMPTS {
            let account = NewAccount {
                account_number: self.numbers.generate(),
                balance: initial_balance.clone(),
                account_type: command.account_type,
                customer_id: command.customer_id,
                active: true,
            };

            match self.store.insert(account).await {
                Ok(stored) => {
                    tracing::info!(
                        account_id = stored.account_id,
                        customer_id = stored.customer_id,
                        account_number = %stored.account_number,
                        "account created"
                    );
                    return Ok(stored);
                }
                Err(StoreError::DuplicateNumber(number)) if attempt + 1 < MAX_NUMBER_ATTEMPTS => {
                    tracing::warn!(%number, "generated account number collided, regenerating");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(
            "exhausted account number generation attempts".to_string(),
        ))
    }

    /// Mark an account active. Activating an already-active account is a
    /// no-op on state.
    pub async fn activate(&self, account_id: i64) -> AppResult<Account> {
        let mut account = self.load(account_id).await?;
        if account.active {
            return Ok(account);
        }

        account.active = true;
        let saved = self.store.save(&account).await?;
        tracing::info!(account_id, "account activated");
        Ok(saved)
    }

    /// Mark an account inactive. Only a zero-balance account may be
    /// deactivated.
    pub async fn deactivate(&self, account_id: i64) -> AppResult<Account> {
        let mut account = self.load(account_id).await?;
        if !account.balance.is_zero() {
            return Err(DomainError::positive_balance(account_id, "deactivated").into());
        }

        account.active = false;
        let saved = self.store.save(&account).await?;
        tracing::info!(account_id, "account deactivated");
        Ok(saved)
    }

    /// Permanently remove a zero-balance account. Its number is retired and
    /// never reissued.
    pub async fn delete(&self, account_id: i64) -> AppResult<()> {
        let account = self.load(account_id).await?;
        if !account.balance.is_zero() {
            return Err(DomainError::positive_balance(account_id, "deleted").into());
        }

        self.store.delete(account_id).await?;
        tracing::info!(account_id, "account deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, account_id: i64) -> AppResult<Account> {
        self.load(account_id).await
    }

    pub async fn get_by_number(&self, account_number: &str) -> AppResult<Account> {
        match self.store.get_by_number(account_number).await {
            Ok(account) => Ok(account),
            Err(StoreError::NumberNotFound(number)) => {
                Err(DomainError::AccountNumberNotFound(number).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_active(&self) -> AppResult<Vec<Account>> {
        Ok(self.store.list_active().await?)
    }

    /// All accounts owned by a customer. A customer with zero accounts is a
    /// not-found outcome, never conflated with a store failure.
    pub async fn get_by_customer(&self, customer_id: i64) -> AppResult<Vec<Account>> {
        let accounts = self.store.list_by_customer(customer_id).await?;
        if accounts.is_empty() {
            return Err(DomainError::CustomerAccountsNotFound(customer_id).into());
        }
        Ok(accounts)
    }

    pub async fn exists_active(&self, account_id: i64) -> AppResult<bool> {
        Ok(self.store.exists_active(account_id).await?)
    }

    pub async fn exists_active_for_customer(&self, customer_id: i64) -> AppResult<bool> {
        Ok(self.store.exists_active_for_customer(customer_id).await?)
    }

    async fn load(&self, account_id: i64) -> AppResult<Account> {
        match self.store.get(account_id).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound(id)) => Err(DomainError::AccountNotFound(id).into()),
            Err(e) => Err(e.into()),
        }
    }
}
