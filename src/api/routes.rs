//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{rejection::PathRejection, FromRequest, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AccountId, AccountIdError, Amount, Balance, LedgerError, TransactionId, TransactionStatus,
};
use crate::error::{AppError, AppResult};
use crate::handlers::{AccountHandler, CreateAccountCommand, TransferCommand, TransferHandler};
use crate::store::LedgerStore;

// =========================================================================
// Request/Response types
// =========================================================================

/// JSON body extractor whose rejections are reported as `400 invalid_request`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub account_id: AccountId,
    pub initial_balance: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account_id: AccountId,
    pub balance: Balance,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub transaction_id: TransactionId,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    /// Echo of the requested amount string
    pub amount: String,
    pub status: TransactionStatus,
}

#[derive(Debug, Serialize)]
pub struct TransactionDetailResponse {
    pub transaction_id: TransactionId,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router<S: LedgerStore>() -> Router<S> {
    Router::new()
        .route("/accounts", post(create_account::<S>))
        .route("/accounts/:account_id", get(get_account::<S>))
        .route("/transactions", post(transfer::<S>))
        .route("/transactions/:transaction_id", get(get_transaction::<S>))
}

// =========================================================================
// POST /accounts
// =========================================================================

/// Open a new account
async fn create_account<S: LedgerStore>(
    State(store): State<S>,
    ApiJson(request): ApiJson<CreateAccountRequest>,
) -> AppResult<StatusCode> {
    let handler = AccountHandler::new(store);

    let command = CreateAccountCommand::new(request.account_id, request.initial_balance);

    match handler.create(command).await {
        Ok(_) => Ok(StatusCode::OK),
        // A bad initial balance is a malformed request, not a ledger failure
        Err(LedgerError::InvalidAmount(msg)) => Err(AppError::InvalidRequest(msg)),
        Err(e) => Err(e.into()),
    }
}

// =========================================================================
// GET /accounts/:account_id
// =========================================================================

/// Get the committed balance of an account
async fn get_account<S: LedgerStore>(
    State(store): State<S>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<AccountResponse>> {
    let Path(raw) = path?;
    let account_id: AccountId = raw
        .parse()
        .map_err(|e: AccountIdError| AppError::InvalidRequest(e.to_string()))?;

    let account = AccountHandler::new(store).get(account_id).await?;

    Ok(Json(AccountResponse {
        account_id: account.id,
        balance: account.balance,
    }))
}

// =========================================================================
// POST /transactions
// =========================================================================

/// Transfer funds between two accounts
async fn transfer<S: LedgerStore>(
    State(store): State<S>,
    ApiJson(request): ApiJson<TransferRequest>,
) -> AppResult<Json<TransferResponse>> {
    // A blank amount is a missing field, like an absent one
    if request.amount.is_empty() {
        return Err(AppError::InvalidRequest("amount is required".to_string()));
    }

    let handler = TransferHandler::new(store);

    let command = TransferCommand::new(
        request.source_account_id,
        request.destination_account_id,
        request.amount.clone(),
    );

    let receipt = handler.execute(command).await?;

    Ok(Json(TransferResponse {
        transaction_id: receipt.transaction_id,
        source_account_id: receipt.source_account_id,
        destination_account_id: receipt.destination_account_id,
        amount: request.amount,
        status: receipt.status,
    }))
}

// =========================================================================
// GET /transactions/:transaction_id
// =========================================================================

/// Get a committed transaction record
async fn get_transaction<S: LedgerStore>(
    State(store): State<S>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<TransactionDetailResponse>> {
    let Path(raw) = path?;
    let transaction_id: TransactionId = raw
        .parse()
        .map_err(|_| AppError::InvalidRequest(format!("invalid transaction_id: {raw}")))?;

    let record = TransferHandler::new(store)
        .get_transaction(transaction_id)
        .await?;

    Ok(Json(TransactionDetailResponse {
        transaction_id: record.id,
        source_account_id: record.source_account_id,
        destination_account_id: record.destination_account_id,
        amount: record.amount,
        status: record.status,
        created_at: record.created_at,
    }))
}
