//! In-memory account store
//!
//! Backs unit and integration tests; the single mutex makes every operation,
//! including the two-account move, trivially indivisible to concurrent
//! callers.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::{Account, Balance, NewAccount};

use super::{AccountStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<i64, Account>,
    retired_numbers: HashSet<String>,
    next_id: i64,
}

/// Mutex-guarded map of account records.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    inner: Mutex<Inner>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply_delta(account: &mut Account, delta: Decimal) -> Result<Decimal, StoreError> {
        let next = account.balance.value() + delta;
        if next < Decimal::ZERO {
            return Err(StoreError::Conflict {
                account_id: account.account_id,
            });
        }
        account.balance = Balance::new(next)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!("balance out of range: {e}")))?;
        account.updated_at = Utc::now();
        Ok(account.balance.value())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, account_id: i64) -> Result<Account, StoreError> {
        self.lock()
            .accounts
            .get(&account_id)
            .cloned()
            .ok_or(StoreError::NotFound(account_id))
    }

    async fn get_by_number(&self, account_number: &str) -> Result<Account, StoreError> {
        self.lock()
            .accounts
            .values()
            .find(|a| a.account_number == account_number)
            .cloned()
            .ok_or_else(|| StoreError::NumberNotFound(account_number.to_string()))
    }

    async fn exists_active(&self, account_id: i64) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .accounts
            .get(&account_id)
            .is_some_and(|a| a.active))
    }

    async fn exists_active_for_customer(&self, customer_id: i64) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .accounts
            .values()
            .any(|a| a.customer_id == customer_id && a.active))
    }

    async fn list_active(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .lock()
            .accounts
            .values()
            .filter(|a| a.active)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.account_id);
        Ok(accounts)
    }

    async fn list_by_customer(&self, customer_id: i64) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .lock()
            .accounts
            .values()
            .filter(|a| a.customer_id == customer_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.account_id);
        Ok(accounts)
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut inner = self.lock();

        let number_taken = inner.retired_numbers.contains(&account.account_number)
            || inner
                .accounts
                .values()
                .any(|a| a.account_number == account.account_number);
        if number_taken {
            return Err(StoreError::DuplicateNumber(account.account_number));
        }

        inner.next_id += 1;
        let now = Utc::now();
        let stored = Account {
            account_id: inner.next_id,
            account_number: account.account_number,
            balance: account.balance,
            account_type: account.account_type,
            customer_id: account.customer_id,
            active: account.active,
            created_at: now,
            updated_at: now,
        };
        inner.accounts.insert(stored.account_id, stored.clone());
        Ok(stored)
    }

    async fn save(&self, account: &Account) -> Result<Account, StoreError> {
        let mut inner = self.lock();
        let slot = inner
            .accounts
            .get_mut(&account.account_id)
            .ok_or(StoreError::NotFound(account.account_id))?;
        *slot = Account {
            updated_at: Utc::now(),
            ..account.clone()
        };
        Ok(slot.clone())
    }

    async fn delete(&self, account_id: i64) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let removed = inner
            .accounts
            .remove(&account_id)
            .ok_or(StoreError::NotFound(account_id))?;
        inner.retired_numbers.insert(removed.account_number);
        Ok(())
    }

    async fn adjust_balance(&self, account_id: i64, delta: Decimal) -> Result<Decimal, StoreError> {
        let mut inner = self.lock();
        let account = inner
            .accounts
            .get_mut(&account_id)
            .ok_or(StoreError::NotFound(account_id))?;
        Self::apply_delta(account, delta)
    }

    async fn transfer_balances(
        &self,
        source_id: i64,
        destination_id: i64,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal), StoreError> {
        let mut inner = self.lock();

        // Validate both sides before mutating either; the single guard then
        // makes the commit below indivisible.
        let new_source = {
            let source = inner
                .accounts
                .get(&source_id)
                .ok_or(StoreError::NotFound(source_id))?;
            let next = source.balance.value() - amount;
            if next < Decimal::ZERO {
                return Err(StoreError::Conflict {
                    account_id: source_id,
                });
            }
            Balance::new(next).map_err(|e| {
                StoreError::Unavailable(anyhow::anyhow!("balance out of range: {e}"))
            })?
        };
        let new_destination = {
            let destination = inner
                .accounts
                .get(&destination_id)
                .ok_or(StoreError::NotFound(destination_id))?;
            Balance::new(destination.balance.value() + amount).map_err(|e| {
                StoreError::Unavailable(anyhow::anyhow!("balance out of range: {e}"))
            })?
        };

        let now = Utc::now();
        let source_balance = new_source.value();
        let destination_balance = new_destination.value();
        if let Some(source) = inner.accounts.get_mut(&source_id) {
            source.balance = new_source;
            source.updated_at = now;
        }
        if let Some(destination) = inner.accounts.get_mut(&destination_id) {
            destination.balance = new_destination;
            destination.updated_at = now;
        }

        Ok((source_balance, destination_balance))
    }
}
