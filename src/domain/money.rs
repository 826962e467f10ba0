//! Monetary types
//!
//! Domain primitives for money with validation at construction time,
//! so invalid values cannot exist inside the system.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// Maximum representable balance
const MAX_AMOUNT: &str = "1000000000000";

/// Maximum decimal places (cents)
const MAX_SCALE: u32 = 2;

/// Amount represents a validated operation amount.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum 2 decimal places
/// - Bounded above by `MAX_AMOUNT`
///
/// Deposits, withdrawals and transfers all take an `Amount`, so the
/// positivity and scale rules cannot diverge between single-leg and
/// two-leg operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount or Balance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Amount must not be negative (got {0})")]
    Negative(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 2 decimal places
    /// - `AmountError::Overflow` if value exceeds the maximum
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        if value.scale() > MAX_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        let max = Decimal::from_str(MAX_AMOUNT).expect("Invalid MAX_AMOUNT constant");
        if value > max {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn try_add(&self, other: &Amount) -> Result<Amount, AmountError> {
        Amount::new(self.0 + other.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal =
            Decimal::from_str(s).map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        format!("{:.2}", amount.0)
    }
}

impl Add for Amount {
    type Output = Result<Amount, AmountError>;

    fn add(self, rhs: Self) -> Self::Output {
        self.try_add(&rhs)
    }
}

// No Sub: subtraction happens on Balance, where the zero floor is checked.

/// Balance represents an account balance. Unlike Amount, Balance can be zero.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Balance(Decimal);

impl Balance {
    /// Create a new balance (zero or positive, max 2 decimal places)
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::Negative(value));
        }

        if value.scale() > MAX_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        let max = Decimal::from_str(MAX_AMOUNT).expect("Invalid MAX_AMOUNT constant");
        if value > max {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Get the underlying value
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Check if balance covers a withdrawal of `amount`
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 + amount.value())
    }

    /// Subtract amount from balance
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 - amount.value())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Balance {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal =
            Decimal::from_str(s).map_err(|e| AmountError::ParseError(e.to_string()))?;
        Balance::new(decimal)
    }
}

impl TryFrom<String> for Balance {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Balance::from_str(&value)
    }
}

impl From<Balance> for String {
    fn from(balance: Balance) -> Self {
        format!("{:.2}", balance.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(Decimal::new(100, 0));
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), Decimal::new(100, 0));
    }

    #[test]
    fn test_amount_zero_rejected() {
        let amount = Amount::new(Decimal::ZERO);
        assert!(matches!(amount, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_negative_rejected() {
        let amount = Amount::new(Decimal::new(-100, 0));
        assert!(matches!(amount, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_too_many_decimals() {
        // 0.123 has 3 decimal places
        let amount = Amount::new(Decimal::new(123, 3));
        assert!(matches!(amount, Err(AmountError::TooManyDecimals(3))));
    }

    #[test]
    fn test_amount_max_decimals_ok() {
        // 0.12 has 2 decimal places
        let amount = Amount::new(Decimal::new(12, 2));
        assert!(amount.is_ok());
    }

    #[test]
    fn test_amount_overflow() {
        let value = Decimal::from_str("1000000000001").unwrap();
        let amount = Amount::new(value);
        assert!(matches!(amount, Err(AmountError::Overflow)));
    }

    #[test]
    fn test_amount_max_value_ok() {
        let value = Decimal::from_str("1000000000000").unwrap();
        let amount = Amount::new(value);
        assert!(amount.is_ok());
    }

    #[test]
    fn test_amount_from_str() {
        let amount: Result<Amount, _> = "123.45".parse();
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), Decimal::new(12345, 2));
    }

    #[test]
    fn test_amount_from_str_three_decimals_rejected() {
        let amount: Result<Amount, _> = "10.001".parse();
        assert!(matches!(amount, Err(AmountError::TooManyDecimals(3))));
    }

    #[test]
    fn test_amount_try_add() {
        let a = Amount::new(Decimal::new(100, 0)).unwrap();
        let b = Amount::new(Decimal::new(50, 0)).unwrap();
        let sum = a.try_add(&b).unwrap();
        assert_eq!(sum.value(), Decimal::new(150, 0));
    }

    #[test]
    fn test_balance_credit_debit() {
        let balance = Balance::zero();
        let amount = Amount::new(Decimal::new(100, 0)).unwrap();

        let balance = balance.credit(&amount).unwrap();
        assert_eq!(balance.value(), Decimal::new(100, 0));

        let withdraw = Amount::new(Decimal::new(30, 0)).unwrap();
        let balance = balance.debit(&withdraw).unwrap();
        assert_eq!(balance.value(), Decimal::new(70, 0));
    }

    #[test]
    fn test_balance_negative_rejected() {
        let balance = Balance::new(Decimal::new(-1, 2));
        assert!(matches!(balance, Err(AmountError::Negative(_))));
    }

    #[test]
    fn test_balance_insufficient() {
        let balance = Balance::new(Decimal::new(50, 0)).unwrap();
        let amount = Amount::new(Decimal::new(100, 0)).unwrap();

        assert!(!balance.is_sufficient_for(&amount));

        let result = balance.debit(&amount);
        assert!(matches!(result, Err(AmountError::Negative(_))));
    }

    #[test]
    fn test_balance_debit_to_zero() {
        let balance = Balance::new(Decimal::new(100, 0)).unwrap();
        let amount = Amount::new(Decimal::new(100, 0)).unwrap();

        assert!(balance.is_sufficient_for(&amount));
        assert!(balance.debit(&amount).unwrap().is_zero());
    }

    #[test]
    fn test_conservation_over_repeated_moves() {
        // Two-decimal arithmetic stays exact over many round trips.
        let mut a = Balance::from_str("1000.00").unwrap();
        let mut b = Balance::from_str("500.00").unwrap();
        let step: Amount = "0.01".parse().unwrap();

        for _ in 0..1000 {
            a = a.debit(&step).unwrap();
            b = b.credit(&step).unwrap();
        }

        assert_eq!(a.value() + b.value(), Decimal::new(150000, 2));
        assert_eq!(a.to_string(), "990.00");
        assert_eq!(b.to_string(), "510.00");
    }
}
