//! Postgres account store
//!
//! sqlx adapter over the `accounts` table. Balance mutations are guarded
//! single-statement updates; the two-account move runs inside one
//! transaction with updates applied in ascending account-id order so that
//! crossing transfers cannot deadlock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::{Account, AccountType, Balance, NewAccount};

use super::{AccountStore, StoreError};

type AccountRow = (
    i64,
    String,
    Decimal,
    String,
    i64,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

const SELECT_COLUMNS: &str =
    "account_id, account_number, balance, account_type, customer_id, active, created_at, updated_at";

/// Account store backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_account(row: AccountRow) -> Result<Account, StoreError> {
        let (account_id, account_number, balance, account_type, customer_id, active, created_at, updated_at) =
            row;
        let balance = Balance::new(balance).map_err(|e| {
            StoreError::Unavailable(anyhow::anyhow!(
                "stored balance out of range for account {account_id}: {e}"
            ))
        })?;
        let account_type = account_type.parse::<AccountType>().map_err(|e| {
            StoreError::Unavailable(anyhow::anyhow!(
                "stored account type invalid for account {account_id}: {e}"
            ))
        })?;
        Ok(Account {
            account_id,
            account_number,
            balance,
            account_type,
            customer_id,
            active,
            created_at,
            updated_at,
        })
    }

    async fn account_exists(&self, account_id: i64) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE account_id = $1)")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Guarded balance update; `None` means the row is missing or the guard
    /// refused the delta.
    async fn try_adjust<'e, E>(
        executor: E,
        account_id: i64,
        delta: Decimal,
    ) -> Result<Option<Decimal>, StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let balance: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET balance = balance + $2, updated_at = NOW()
            WHERE account_id = $1 AND balance + $2 >= 0
            RETURNING balance
            "#,
        )
        .bind(account_id)
        .bind(delta)
        .fetch_optional(executor)
        .await?;

        Ok(balance)
    }

    /// Classify a refused guarded update: a missing row is `NotFound`, an
    /// existing row means the caller's snapshot was stale.
    async fn refusal(&self, account_id: i64) -> StoreError {
        match self.account_exists(account_id).await {
            Ok(true) => StoreError::Conflict { account_id },
            Ok(false) => StoreError::NotFound(account_id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn get(&self, account_id: i64) -> Result<Account, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM accounts WHERE account_id = $1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(StoreError::NotFound(account_id))?;
        Self::row_to_account(row)
    }

    async fn get_by_number(&self, account_number: &str) -> Result<Account, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM accounts WHERE account_number = $1"
        ))
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| StoreError::NumberNotFound(account_number.to_string()))?;
        Self::row_to_account(row)
    }

    async fn exists_active(&self, account_id: i64) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE account_id = $1 AND active)",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn exists_active_for_customer(&self, customer_id: i64) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE customer_id = $1 AND active)",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_active(&self) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM accounts WHERE active ORDER BY account_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_account).collect()
    }

    async fn list_by_customer(&self, customer_id: i64) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM accounts WHERE customer_id = $1 ORDER BY account_id"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_account).collect()
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Retired numbers stay reserved forever.
        let retired: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM retired_account_numbers WHERE account_number = $1)",
        )
        .bind(&account.account_number)
        .fetch_one(&mut *tx)
        .await?;
        if retired {
            return Err(StoreError::DuplicateNumber(account.account_number));
        }

        let row: AccountRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO accounts (account_number, balance, account_type, customer_id, active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(&account.account_number)
        .bind(account.balance.value())
        .bind(account.account_type.as_str())
        .bind(account.customer_id)
        .bind(account.active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateNumber(account.account_number.clone())
            }
            _ => StoreError::from(e),
        })?;

        tx.commit().await?;
        Self::row_to_account(row)
    }

    async fn save(&self, account: &Account) -> Result<Account, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            r#"
            UPDATE accounts
            SET account_number = $2,
                balance = $3,
                account_type = $4,
                customer_id = $5,
                active = $6,
                updated_at = NOW()
            WHERE account_id = $1
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(account.account_id)
        .bind(&account.account_number)
        .bind(account.balance.value())
        .bind(account.account_type.as_str())
        .bind(account.customer_id)
        .bind(account.active)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(StoreError::NotFound(account.account_id))?;
        Self::row_to_account(row)
    }

    async fn delete(&self, account_id: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let number: Option<String> =
            sqlx::query_scalar("SELECT account_number FROM accounts WHERE account_id = $1")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
        let number = number.ok_or(StoreError::NotFound(account_id))?;

        sqlx::query(
            r#"
            INSERT INTO retired_account_numbers (account_number)
            VALUES ($1)
            ON CONFLICT (account_number) DO NOTHING
            "#,
        )
        .bind(&number)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM accounts WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn adjust_balance(&self, account_id: i64, delta: Decimal) -> Result<Decimal, StoreError> {
        match Self::try_adjust(&self.pool, account_id, delta).await? {
            Some(balance) => Ok(balance),
            None => Err(self.refusal(account_id).await),
        }
    }

    async fn transfer_balances(
        &self,
        source_id: i64,
        destination_id: i64,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Apply in ascending id order; crossing transfers then acquire row
        // locks in the same sequence.
        let mut deltas = [(source_id, -amount), (destination_id, amount)];
        deltas.sort_by_key(|(id, _)| *id);

        let mut balances = [Decimal::ZERO; 2];
        for (slot, (account_id, delta)) in deltas.iter().enumerate() {
            match Self::try_adjust(&mut *tx, *account_id, *delta).await? {
                Some(balance) => balances[slot] = balance,
                None => {
                    tx.rollback().await?;
                    return Err(self.refusal(*account_id).await);
                }
            }
        }

        tx.commit().await?;

        let source_balance = if deltas[0].0 == source_id {
            balances[0]
        } else {
            balances[1]
        };
        let destination_balance = if deltas[0].0 == source_id {
            balances[1]
        } else {
            balances[0]
        };
        Ok((source_balance, destination_balance))
    }
}
