//! Merchant category rule handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};

use crate::{get_user_email, read_json, AppError, AppState, SuccessResponse};
use fintrack_core::models::{
    MerchantCategoryRule, MerchantCategoryRuleUpdate, NewMerchantCategoryRule, RuleApplyReport,
};

/// GET /api/merchant-rules
pub async fn list_merchant_rules(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<MerchantCategoryRule>>, AppError> {
    let user_email = get_user_email(request.headers());

    let rules = state.db.list_merchant_rules()?;

    state.db.log_audit(
        &user_email,
        "list",
        Some("merchant_rule"),
        None,
        Some(&format!("count={}", rules.len())),
    )?;

    Ok(Json(rules))
}

/// POST /api/merchant-rules
pub async fn create_merchant_rule(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<MerchantCategoryRule>), AppError> {
    let user_email = get_user_email(request.headers());
    let req: NewMerchantCategoryRule = read_json(request).await?;

    let rule = state.db.create_merchant_rule(&req)?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("merchant_rule"),
        Some(rule.id),
        Some(&format!(
            "{} -> {} (exact {})",
            rule.merchant_pattern, rule.category, rule.exact_match
        )),
    )?;

    Ok((StatusCode::CREATED, Json(rule)))
}

/// PUT /api/merchant-rules/:id
pub async fn update_merchant_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<MerchantCategoryRule>, AppError> {
    let user_email = get_user_email(request.headers());
    let update: MerchantCategoryRuleUpdate = read_json(request).await?;

    let rule = state.db.update_merchant_rule(id, &update)?;

    state.db.log_audit(
        &user_email,
        "update",
        Some("merchant_rule"),
        Some(id),
        Some(&format!(
            "{} -> {} (active {})",
            rule.merchant_pattern, rule.category, rule.is_active
        )),
    )?;

    Ok(Json(rule))
}

/// DELETE /api/merchant-rules/:id
pub async fn delete_merchant_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    state.db.delete_merchant_rule(id)?;

    state
        .db
        .log_audit(&user_email, "delete", Some("merchant_rule"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/merchant-rules/apply - Recategorize stored transactions
pub async fn apply_merchant_rules(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<RuleApplyReport>, AppError> {
    let user_email = get_user_email(request.headers());

    let report = state.db.apply_merchant_rules()?;

    state.db.log_audit(
        &user_email,
        "apply",
        Some("merchant_rule"),
        None,
        Some(&format!(
            "updated={} failed={}",
            report.updated,
            report.errors.len()
        )),
    )?;

    Ok(Json(report))
}
