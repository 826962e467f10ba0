//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Business rule violations
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Account store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, error, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                self.to_string(),
                Some(msg.clone()),
            ),

            AppError::Domain(domain_err) => {
                let (status, code) = match domain_err {
                    DomainError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
                    DomainError::AccountNotFound(_)
                    | DomainError::AccountNumberNotFound(_)
                    | DomainError::CustomerAccountsNotFound(_) => {
                        (StatusCode::NOT_FOUND, "account_not_found")
                    }
                    DomainError::CustomerNotFound(_) => {
                        (StatusCode::NOT_FOUND, "customer_not_found")
                    }
                    DomainError::CustomerInactive(_) => {
                        (StatusCode::BAD_REQUEST, "customer_inactive")
                    }
                    DomainError::PositiveBalance { .. } => {
                        (StatusCode::BAD_REQUEST, "positive_balance")
                    }
                    // A short balance is a conflict with current account
                    // state, not a malformed request.
                    DomainError::InsufficientFunds { .. } => {
                        (StatusCode::CONFLICT, "insufficient_funds")
                    }
                    DomainError::ExternalServiceUnavailable(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "external_service_unavailable")
                    }
                };
                (status, code, domain_err.to_string(), None)
            }

            AppError::Store(store_err) => match store_err {
                StoreError::NotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "account_not_found",
                    format!("The account with ID {id} does not exist."),
                    None,
                ),
                StoreError::NumberNotFound(number) => (
                    StatusCode::NOT_FOUND,
                    "account_not_found",
                    format!("The account with number {number} does not exist."),
                    None,
                ),
                StoreError::DuplicateNumber(_) => (
                    StatusCode::CONFLICT,
                    "account_number_conflict",
                    "Account number is already in use.".to_string(),
                    None,
                ),
                StoreError::Conflict { .. } => (
                    StatusCode::CONFLICT,
                    "concurrent_modification",
                    "The account was modified concurrently. Retry the operation.".to_string(),
                    None,
                ),
                // Detail goes to the log, never to the caller.
                StoreError::Unavailable(e) => {
                    tracing::error!("Account store error: {e:?}");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "service_unavailable",
                        "Service unavailable.".to_string(),
                        None,
                    )
                }
            },

            // 500 Internal Server Error
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error.".to_string(),
                    None,
                )
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "config_error",
                    "Internal server error.".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
