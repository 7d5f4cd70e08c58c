//! Transaction filter configuration handlers

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::{get_user_email, read_json, AppError, AppState};
use fintrack_core::{TransactionFilterConfig, TransactionFilterUpdate};

#[derive(Serialize)]
pub struct FilterConfigResponse {
    #[serde(flatten)]
    pub config: TransactionFilterConfig,
    /// Earliest date a provider fetch made today should request
    pub fetch_start_date: NaiveDate,
}

/// GET /api/config/transaction-filter
pub async fn get_filter_config(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<FilterConfigResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    let config = state.filter.read().await.clone();
    let fetch_start_date = config.fetch_start_date(Utc::now().date_naive());

    state
        .db
        .log_audit(&user_email, "view", Some("transaction_filter"), None, None)?;

    Ok(Json(FilterConfigResponse {
        config,
        fetch_start_date,
    }))
}

/// PUT /api/config/transaction-filter - Partial update; invalid values change nothing
pub async fn update_filter_config(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<TransactionFilterConfig>, AppError> {
    let user_email = get_user_email(request.headers());
    let update: TransactionFilterUpdate = read_json(request).await?;

    let config = {
        let mut filter = state.filter.write().await;
        filter.apply_update(&update)?;
        filter.clone()
    };

    state.db.log_audit(
        &user_email,
        "update",
        Some("transaction_filter"),
        None,
        Some(&format!(
            "enable_date_filtering={}, default_start_date={:?}, max_days_requested={}",
            config.enable_date_filtering, config.default_start_date, config.max_days_requested
        )),
    )?;

    Ok(Json(config))
}
