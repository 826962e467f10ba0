//! Account record
//!
//! The sole persisted entity: a balance-holding record owned by a customer,
//! identified by an internal id and an external account number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Balance;

/// Account type, a closed enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Savings,
    Checking,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "SAVINGS",
            AccountType::Checking => "CHECKING",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAVINGS" => Ok(AccountType::Savings),
            "CHECKING" => Ok(AccountType::Checking),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

/// A stored account.
///
/// `account_id` is assigned by the store on insert and immutable after.
/// `account_number` is generated once at creation and never reissued, even
/// after the account is deleted. Timestamps are stamped by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: i64,
    pub account_number: String,
    pub balance: Balance,
    pub account_type: AccountType,
    pub customer_id: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account data as handed to the store for insertion; the store assigns the
/// id and stamps both timestamps.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub account_number: String,
    pub balance: Balance,
    pub account_type: AccountType,
    pub customer_id: i64,
    pub active: bool,
}
