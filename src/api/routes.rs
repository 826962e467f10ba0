//! API Routes
//!
//! HTTP endpoint definitions. Handlers parse DTOs and delegate to the
//! operation handlers; no business rule lives here.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Account, AccountType, Balance};
use crate::error::AppError;
use crate::handlers::{
    AccountHandler, CreateAccountCommand, FundsHandler, TransferCheck, TransferCommand,
    TransferHandler, TransferKind, TransferOutcome,
};

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub customer_id: i64,
    /// Initial balance as a decimal string, e.g. "100.00"
    pub initial_balance: String,
    pub account_type: AccountType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account_id: i64,
    pub account_number: String,
    pub balance: Balance,
    pub account_type: AccountType,
    pub customer_id: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.account_id,
            account_number: account.account_number,
            balance: account.balance,
            account_type: account.account_type,
            customer_id: account.customer_id,
            active: account.active,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AmountRequest {
    /// Operation amount as a decimal string, e.g. "25.00"
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub source_account_id: i64,
    pub destination_account_id: i64,
    pub amount: String,
    #[serde(default)]
    pub kind: TransferKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferValidationRequest {
    pub source_account_id: i64,
    pub destination_account_id: i64,
    pub amount: String,
}

/// Transfer result body; failure fields and success fields are mutually
/// exclusive.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_source_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_destination_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransferKind>,
}

impl From<TransferOutcome> for TransferResponse {
    fn from(outcome: TransferOutcome) -> Self {
        match outcome {
            TransferOutcome::Completed {
                source_account_id,
                destination_account_id,
                source_balance,
                destination_balance,
                kind,
            } => Self {
                success: true,
                error_code: None,
                error_message: None,
                source_account_id: Some(source_account_id),
                destination_account_id: Some(destination_account_id),
                final_source_balance: Some(source_balance),
                final_destination_balance: Some(destination_balance),
                kind: Some(kind),
            },
            TransferOutcome::Rejected(rejection) => Self {
                success: false,
                error_code: Some(rejection.code().to_string()),
                error_message: Some(rejection.message()),
                source_account_id: None,
                destination_account_id: None,
                final_source_balance: None,
                final_destination_balance: None,
                kind: None,
            },
        }
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_active_accounts).post(create_account))
        .route(
            "/accounts/:account_id",
            get(get_account).delete(delete_account),
        )
        .route("/accounts/:account_id/activate", patch(activate_account))
        .route("/accounts/:account_id/deactivate", patch(deactivate_account))
        .route("/accounts/:account_id/deposit", post(deposit))
        .route("/accounts/:account_id/withdraw", post(withdraw))
        .route("/accounts/number/:account_number", get(get_account_by_number))
        .route(
            "/accounts/customer/:customer_id",
            get(get_accounts_by_customer),
        )
        .route("/transfers", post(execute_transfer))
        .route("/transfers/validate", post(validate_transfer))
        .route(
            "/internal/customers/:customer_id/active-account",
            get(customer_has_active_account),
        )
        .route(
            "/internal/accounts/:account_id/active",
            get(account_is_active),
        )
}

fn account_handler(state: &AppState) -> AccountHandler {
    AccountHandler::new(
        state.store.clone(),
        state.customers.clone(),
        state.numbers.clone(),
    )
}

// =========================================================================
// Account endpoints
// =========================================================================

/// List all active accounts
async fn list_active_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let accounts = account_handler(&state).list_active().await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

/// Open a new account
async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let command = CreateAccountCommand::new(
        request.customer_id,
        request.initial_balance,
        request.account_type,
    );
    let account = account_handler(&state).create(command).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Get account by id
async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = account_handler(&state).get_by_id(account_id).await?;
    Ok(Json(account.into()))
}

/// Get account by its external number
async fn get_account_by_number(
    State(state): State<AppState>,
    Path(account_number): Path<String>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = account_handler(&state)
        .get_by_number(&account_number)
        .await?;
    Ok(Json(account.into()))
}

/// List a customer's accounts
async fn get_accounts_by_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let accounts = account_handler(&state).get_by_customer(customer_id).await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

/// Activate an account
async fn activate_account(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = account_handler(&state).activate(account_id).await?;
    Ok(Json(account.into()))
}

/// Deactivate a zero-balance account
async fn deactivate_account(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = account_handler(&state).deactivate(account_id).await?;
    Ok(Json(account.into()))
}

/// Delete a zero-balance account
async fn delete_account(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    account_handler(&state).delete(account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Funds endpoints
// =========================================================================

/// Deposit into an account
async fn deposit(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = FundsHandler::new(state.store.clone())
        .deposit(account_id, &request.amount)
        .await?;
    Ok(Json(account.into()))
}

/// Withdraw from an account
async fn withdraw(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = FundsHandler::new(state.store.clone())
        .withdraw(account_id, &request.amount)
        .await?;
    Ok(Json(account.into()))
}

// =========================================================================
// Transfer endpoints
// =========================================================================

/// Execute a transfer. Business rejections come back in the body with
/// success=false; the status is 200 either way.
async fn execute_transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, AppError> {
    let command = TransferCommand::new(
        request.source_account_id,
        request.destination_account_id,
        request.amount,
    )
    .with_kind(request.kind);

    let outcome = TransferHandler::new(state.store.clone())
        .execute(command)
        .await?;
    Ok(Json(outcome.into()))
}

/// Pre-flight transfer validation; performs no mutation
async fn validate_transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferValidationRequest>,
) -> Result<Json<TransferCheck>, AppError> {
    let check = TransferHandler::new(state.store.clone())
        .validate(
            request.source_account_id,
            request.destination_account_id,
            &request.amount,
        )
        .await?;
    Ok(Json(check))
}

// =========================================================================
// Internal endpoints (service-to-service)
// =========================================================================

/// Whether the customer has at least one active account
async fn customer_has_active_account(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> Result<Json<bool>, AppError> {
    let exists = account_handler(&state)
        .exists_active_for_customer(customer_id)
        .await?;
    Ok(Json(exists))
}

/// Whether the account exists and is active
async fn account_is_active(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> Result<Json<bool>, AppError> {
    let exists = account_handler(&state).exists_active(account_id).await?;
    Ok(Json(exists))
}
