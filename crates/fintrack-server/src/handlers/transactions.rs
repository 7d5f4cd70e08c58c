//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    get_user_email, read_json, AppError, AppState, SuccessResponse, MAX_BODY_SIZE, MAX_PAGE_LIMIT,
};
use fintrack_core::db::TransactionInsertResult;
use fintrack_core::models::{
    NewTransaction, RecurrencePattern, Transaction, TransactionSummary, TransactionType,
};
use fintrack_core::{parse_bank_transactions, IngestReport, Ingestor, TransactionQuery};

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    /// Calendar month, YYYY-MM
    pub month: Option<String>,
    pub account_id: Option<String>,
    pub app_category: Option<String>,
    pub is_recurring: Option<bool>,
    /// Matches details or notes
    pub search: Option<String>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub transactions: Vec<Transaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// GET /api/transactions - List transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTransactionsQuery>,
    request: Request,
) -> Result<Json<TransactionResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    // Input validation: clamp pagination parameters
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    let offset = params.offset.max(0);

    let query = TransactionQuery::new()
        .month(params.month.as_deref())
        .account_id(params.account_id.as_deref())
        .app_category(params.app_category.as_deref())
        .is_recurring(params.is_recurring)
        .search(params.search.as_deref());
    let total = state.db.count_transactions(&query)?;
    let transactions = state
        .db
        .list_transactions(&query.limit(Some(limit)).offset(Some(offset)))?;

    state.db.log_audit(
        &user_email,
        "list",
        Some("transaction"),
        None,
        Some(&format!(
            "limit={}, offset={}, month={:?}, account_id={:?}, app_category={:?}, is_recurring={:?}, search={:?}, returned={}",
            limit,
            offset,
            params.month,
            params.account_id,
            params.app_category,
            params.is_recurring,
            params.search,
            transactions.len()
        )),
    )?;

    Ok(Json(TransactionResponse {
        transactions,
        total,
        limit,
        offset,
    }))
}

/// POST /api/transactions - Manually add a transaction
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let user_email = get_user_email(request.headers());
    let req: NewTransaction = read_json(request).await?;

    let id = match state.db.insert_transaction(&req)? {
        TransactionInsertResult::Inserted(id) => id,
        TransactionInsertResult::Duplicate(id) => {
            return Err(AppError::conflict(&format!(
                "Transaction already exists with id {}",
                id
            )))
        }
    };
    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::internal("Transaction vanished after insert"))?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("transaction"),
        Some(id),
        Some(&format!(
            "{} {} {}",
            transaction.date, transaction.details, transaction.amount
        )),
    )?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET /api/transactions/summary - Totals by type, raw category and account
pub async fn transaction_summary(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<TransactionSummary>, AppError> {
    let user_email = get_user_email(request.headers());

    let summary = state.db.transaction_summary()?;

    state
        .db
        .log_audit(&user_email, "view", Some("transaction_summary"), None, None)?;

    Ok(Json(summary))
}

/// GET /api/transactions/:id
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Transaction>, AppError> {
    let user_email = get_user_email(request.headers());

    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    state
        .db
        .log_audit(&user_email, "view", Some("transaction"), Some(id), None)?;

    Ok(Json(transaction))
}

/// DELETE /api/transactions/:id
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    state.db.delete_transaction(id)?;

    state
        .db
        .log_audit(&user_email, "delete", Some("transaction"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// Request body for recategorizing a transaction
#[derive(Debug, Deserialize)]
pub struct SetCategoryRequest {
    /// Raw category
    pub category: Option<String>,
    pub app_category: Option<String>,
}

/// POST /api/transactions/:id/category - Set the raw and/or app category
pub async fn set_transaction_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Transaction>, AppError> {
    let user_email = get_user_email(request.headers());
    let req: SetCategoryRequest = read_json(request).await?;

    let category = req.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let app_category = req
        .app_category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if category.is_none() && app_category.is_none() {
        return Err(AppError::bad_request(
            "category or app_category is required",
        ));
    }

    if let Some(category) = category {
        state.db.update_transaction_category(id, category)?;
    }
    if let Some(app_category) = app_category {
        state.db.update_transaction_app_category(id, app_category)?;
    }
    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    state.db.log_audit(
        &user_email,
        "update_category",
        Some("transaction"),
        Some(id),
        Some(&format!(
            "category={:?}, app_category={:?}",
            category, app_category
        )),
    )?;

    Ok(Json(transaction))
}

#[derive(Debug, Deserialize)]
pub struct SetTypeRequest {
    #[serde(default)]
    pub transaction_type: String,
}

/// POST /api/transactions/:id/type - "Debit" or "Credit"
pub async fn set_transaction_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Transaction>, AppError> {
    let user_email = get_user_email(request.headers());
    let req: SetTypeRequest = read_json(request).await?;

    let transaction_type: TransactionType = req
        .transaction_type
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;

    state.db.update_transaction_type(id, transaction_type)?;
    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    state.db.log_audit(
        &user_email,
        "update_type",
        Some("transaction"),
        Some(id),
        Some(transaction_type.as_str()),
    )?;

    Ok(Json(transaction))
}

#[derive(Debug, Deserialize)]
pub struct SetRecurrenceRequest {
    pub is_recurring: bool,
    pub recurrence_pattern: Option<String>,
}

/// POST /api/transactions/:id/recurrence
pub async fn set_transaction_recurrence(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Transaction>, AppError> {
    let user_email = get_user_email(request.headers());
    let req: SetRecurrenceRequest = read_json(request).await?;

    let pattern = req
        .recurrence_pattern
        .as_deref()
        .map(str::parse::<RecurrencePattern>)
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?;

    state
        .db
        .set_transaction_recurrence(id, req.is_recurring, pattern)?;
    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    state.db.log_audit(
        &user_email,
        "update_recurrence",
        Some("transaction"),
        Some(id),
        Some(&format!(
            "is_recurring={}, pattern={:?}",
            req.is_recurring, pattern
        )),
    )?;

    Ok(Json(transaction))
}

/// POST /api/transactions/ingest - Store a batch of bank transactions
///
/// Accepts a JSON list or `{"transactions": [...]}`.
pub async fn ingest_transactions(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<IngestReport>, AppError> {
    let user_email = get_user_email(request.headers());

    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let transactions = parse_bank_transactions(&bytes[..])
        .map_err(|e| AppError::bad_request(&format!("Invalid transactions: {}", e)))?;

    let filter = state.filter.read().await.clone();
    let report = Ingestor::new(&state.db, filter).ingest(&transactions)?;

    state.db.log_audit(
        &user_email,
        "ingest",
        Some("transaction"),
        None,
        Some(&format!(
            "fetched={}, saved={}, filtered={}, duplicates={}, errors={}",
            report.fetched,
            report.saved,
            report.filtered,
            report.duplicates,
            report.errors.len()
        )),
    )?;

    Ok(Json(report))
}
