//! Boundary collaborators
//!
//! Clients the core consumes: the customer microservice and the account
//! number generator. Both are injected as trait objects so tests can
//! substitute fakes.

pub mod customer;
pub mod number;

pub use customer::{CustomerDirectory, CustomerValidation, HttpCustomerDirectory};
pub use number::{AccountNumberGenerator, UuidAccountNumberGenerator};
