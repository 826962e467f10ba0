//! Domain Error Types
//!
//! Pure business-rule errors, independent of storage and transport.

use thiserror::Error;

/// Business rule violations and domain invariant failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid amount (zero, negative, too many decimals)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Account not found
    #[error("The account with ID {0} does not exist.")]
    AccountNotFound(i64),

    /// No account exists for the given account number
    #[error("The account with number {0} does not exist.")]
    AccountNumberNotFound(String),

    /// The customer owns no accounts
    #[error("No accounts found for customer ID {0}.")]
    CustomerAccountsNotFound(i64),

    /// Customer unknown to the customer directory
    #[error("Customer not found for ID: {0}")]
    CustomerNotFound(i64),

    /// Customer exists but is not active
    #[error("Customer with ID {0} is not active.")]
    CustomerInactive(i64),

    /// Deactivate/delete blocked by a non-zero balance
    #[error("Account with ID: {account_id} cannot be {operation} because it has a positive balance.")]
    PositiveBalance {
        account_id: i64,
        operation: &'static str,
    },

    /// Insufficient balance for a withdrawal
    #[error("Insufficient balance in account {account_id}: {available}")]
    InsufficientFunds {
        account_id: i64,
        available: rust_decimal::Decimal,
    },

    /// The customer directory could not be reached
    #[error("Unable to connect to the customer service. {0}")]
    ExternalServiceUnavailable(String),
}

impl DomainError {
    pub fn positive_balance(account_id: i64, operation: &'static str) -> Self {
        Self::PositiveBalance {
            account_id,
            operation,
        }
    }

    pub fn insufficient_funds(account_id: i64, available: rust_decimal::Decimal) -> Self {
        Self::InsufficientFunds {
            account_id,
            available,
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::ExternalServiceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_insufficient_funds_reports_current_balance() {
        let err = DomainError::insufficient_funds(7, Decimal::new(5000, 2));

        assert!(err.is_client_error());
        assert!(err.to_string().contains("50.00"));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_positive_balance_error_names_operation() {
        let err = DomainError::positive_balance(3, "deactivated");
        assert!(err.to_string().contains("deactivated"));
        assert!(err.to_string().contains("ID: 3"));
    }

    #[test]
    fn test_connectivity_failure_is_not_client_error() {
        let err = DomainError::ExternalServiceUnavailable("connection refused".into());
        assert!(!err.is_client_error());
    }
}
