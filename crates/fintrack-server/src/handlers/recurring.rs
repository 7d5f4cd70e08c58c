//! Recurring rule and pattern handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};

use crate::{get_user_email, read_json, AppError, AppState, SuccessResponse};
use fintrack_core::models::{
    NewRecurringRule, RecurringPatternSummary, RecurringRule, RecurringRuleUpdate,
    RuleApplyReport,
};

/// GET /api/recurring/rules - Active rules by merchant
pub async fn list_recurring_rules(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<RecurringRule>>, AppError> {
    let user_email = get_user_email(request.headers());

    let rules = state.db.list_recurring_rules()?;

    state.db.log_audit(
        &user_email,
        "list",
        Some("recurring_rule"),
        None,
        Some(&format!("count={}", rules.len())),
    )?;

    Ok(Json(rules))
}

/// POST /api/recurring/rules
pub async fn create_recurring_rule(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<RecurringRule>), AppError> {
    let user_email = get_user_email(request.headers());
    let req: NewRecurringRule = read_json(request).await?;

    let rule = state.db.create_recurring_rule(&req)?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("recurring_rule"),
        Some(rule.id),
        Some(&format!("{} ({})", rule.merchant, rule.match_type)),
    )?;

    Ok((StatusCode::CREATED, Json(rule)))
}

/// PUT /api/recurring/rules/:id
pub async fn update_recurring_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<RecurringRule>, AppError> {
    let user_email = get_user_email(request.headers());
    let update: RecurringRuleUpdate = read_json(request).await?;

    let rule = state.db.update_recurring_rule(id, &update)?;

    state.db.log_audit(
        &user_email,
        "update",
        Some("recurring_rule"),
        Some(id),
        Some(&format!(
            "{} ({}, active {})",
            rule.merchant, rule.match_type, rule.active
        )),
    )?;

    Ok(Json(rule))
}

/// DELETE /api/recurring/rules/:id
pub async fn delete_recurring_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    state.db.delete_recurring_rule(id)?;

    state
        .db
        .log_audit(&user_email, "delete", Some("recurring_rule"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/recurring/patterns - Cadence summaries of recurring transactions
pub async fn recurring_patterns(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<RecurringPatternSummary>>, AppError> {
    let user_email = get_user_email(request.headers());

    let patterns = state.db.recurring_patterns()?;

    state.db.log_audit(
        &user_email,
        "view",
        Some("recurring_pattern"),
        None,
        Some(&format!("groups={}", patterns.len())),
    )?;

    Ok(Json(patterns))
}

/// POST /api/recurring/apply_rules - Flag matching transactions as recurring
pub async fn apply_recurring_rules(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<RuleApplyReport>, AppError> {
    let user_email = get_user_email(request.headers());

    let report = state.db.apply_recurring_rules()?;

    state.db.log_audit(
        &user_email,
        "apply",
        Some("recurring_rule"),
        None,
        Some(&format!(
            "updated={} failed={}",
            report.updated,
            report.errors.len()
        )),
    )?;

    Ok(Json(report))
}
