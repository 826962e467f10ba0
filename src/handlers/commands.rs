//! Command and result definitions
//!
//! Commands represent intentions to change account state. Transfer outcomes
//! are values: a rejected transfer is a result, not an error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::AccountType;

/// Command to open a new account for a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountCommand {
    pub customer_id: i64,
    /// Initial balance (as string for precise decimal)
    pub initial_balance: String,
    pub account_type: AccountType,
}

impl CreateAccountCommand {
    pub fn new(customer_id: i64, initial_balance: String, account_type: AccountType) -> Self {
        Self {
            customer_id,
            initial_balance,
            account_type,
        }
    }
}

/// Whether a transfer stays within one customer's accounts or crosses to a
/// third party. Metadata for clients; the correctness rules are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferKind {
    OwnAccount,
    ThirdParty,
}

impl Default for TransferKind {
    fn default() -> Self {
        Self::ThirdParty
    }
}

/// Command to move funds between two accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub source_account_id: i64,
    pub destination_account_id: i64,
    /// Amount to transfer (as string for precise decimal)
    pub amount: String,
    #[serde(default)]
    pub kind: TransferKind,
}

impl TransferCommand {
    pub fn new(source_account_id: i64, destination_account_id: i64, amount: String) -> Self {
        Self {
            source_account_id,
            destination_account_id,
            amount,
            kind: TransferKind::default(),
        }
    }

    pub fn with_kind(mut self, kind: TransferKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Why a transfer was refused. Each variant carries a stable
/// machine-readable code and a message naming the account involved.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferRejection {
    SameAccount,
    SourceAccountNotFound { account_id: i64 },
    SourceAccountInactive { account_id: i64 },
    InsufficientFunds { account_id: i64, available: Decimal },
    DestinationAccountNotFound { account_id: i64 },
    DestinationAccountInactive { account_id: i64 },
}

impl TransferRejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SameAccount => "SAME_ACCOUNT",
            Self::SourceAccountNotFound { .. } => "SOURCE_ACCOUNT_NOT_FOUND",
            Self::SourceAccountInactive { .. } => "SOURCE_ACCOUNT_INACTIVE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::DestinationAccountNotFound { .. } => "DESTINATION_ACCOUNT_NOT_FOUND",
            Self::DestinationAccountInactive { .. } => "DESTINATION_ACCOUNT_INACTIVE",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::SameAccount => "Cannot transfer to the same account".to_string(),
            Self::SourceAccountNotFound { account_id } => {
                format!("Source account not found for ID: {account_id}")
            }
            Self::SourceAccountInactive { account_id } => {
                format!("Source account is not active for ID: {account_id}")
            }
            Self::InsufficientFunds { available, .. } => {
                format!("Insufficient balance in source account: {available}")
            }
            Self::DestinationAccountNotFound { account_id } => {
                format!("Destination account not found for ID: {account_id}")
            }
            Self::DestinationAccountInactive { account_id } => {
                format!("Destination account is not active for ID: {account_id}")
            }
        }
    }
}

/// Result of an executed transfer. Business rejections come back through
/// this value; only infrastructure failures surface as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    Completed {
        source_account_id: i64,
        destination_account_id: i64,
        source_balance: Decimal,
        destination_balance: Decimal,
        kind: TransferKind,
    },
    Rejected(TransferRejection),
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Result of a pre-flight transfer validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TransferCheck {
    pub fn valid() -> Self {
        Self {
            valid: true,
            code: None,
            message: None,
        }
    }

    pub fn invalid(rejection: &TransferRejection) -> Self {
        Self {
            valid: false,
            code: Some(rejection.code().to_string()),
            message: Some(rejection.message()),
        }
    }
}
