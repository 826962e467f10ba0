//! Account store port
//!
//! Abstraction over durable account storage. Adapters provide the actual
//! access logic: `PgAccountStore` for Postgres, `MemoryAccountStore` for
//! tests.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Account, NewAccount};

mod memory;
mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

/// Storage-level failures.
///
/// Business rules never live here: a `Conflict` means a guarded balance
/// update observed state newer than the caller's snapshot and must be
/// retried by the caller, never reported as a business rejection.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("account {0} not found")]
    NotFound(i64),

    #[error("account number {0} not found")]
    NumberNotFound(String),

    #[error("account number {0} already issued")]
    DuplicateNumber(String),

    #[error("stale balance snapshot for account {account_id}")]
    Conflict { account_id: i64 },

    #[error("account store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.into())
    }
}

/// Durable keyed storage of account records.
///
/// `adjust_balance` and `transfer_balances` are the mutation primitives the
/// funds and transfer handlers compose: each is indivisible to concurrent
/// callers and refuses to take any balance below zero.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Point lookup by id
    async fn get(&self, account_id: i64) -> Result<Account, StoreError>;

    /// Point lookup by external account number
    async fn get_by_number(&self, account_number: &str) -> Result<Account, StoreError>;

    /// True if the account exists and is active
    async fn exists_active(&self, account_id: i64) -> Result<bool, StoreError>;

    /// True if the customer has at least one active account
    async fn exists_active_for_customer(&self, customer_id: i64) -> Result<bool, StoreError>;

    /// All active accounts
    async fn list_active(&self) -> Result<Vec<Account>, StoreError>;

    /// All accounts owned by a customer (may be empty)
    async fn list_by_customer(&self, customer_id: i64) -> Result<Vec<Account>, StoreError>;

    /// Insert a new record: assigns the id, stamps both timestamps, and
    /// rejects an account number that is in use or was ever retired.
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Full-record update; stamps `updated_at`.
    async fn save(&self, account: &Account) -> Result<Account, StoreError>;

    /// Hard delete. The account number is retired and never reissued.
    async fn delete(&self, account_id: i64) -> Result<(), StoreError>;

    /// Atomically add `delta` to the balance and return the new balance.
    /// Fails with `Conflict` if the result would be negative (the caller's
    /// snapshot was stale).
    async fn adjust_balance(&self, account_id: i64, delta: Decimal) -> Result<Decimal, StoreError>;

    /// Atomically move `amount` from source to destination: both balances
    /// change and become durable, or neither does. Returns the new
    /// (source, destination) balances. Fails with `Conflict` if the source
    /// no longer covers `amount`.
    async fn transfer_balances(
        &self,
        source_id: i64,
        destination_id: i64,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal), StoreError>;
}
