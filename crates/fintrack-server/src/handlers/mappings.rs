//! Merchant mapping handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{get_user_email, read_json, AppError, AppState, SuccessResponse};
use fintrack_core::bulk::{bulk_assign, bulk_create_mappings, BulkAssignReport, BulkCreateReport};
use fintrack_core::models::{
    MappingMatch, MappingStats, MerchantMapping, MerchantMappingFilter, MerchantMappingUpdate,
    NewMerchantMapping,
};
use fintrack_core::BulkAssignRequest;

/// GET /api/merchant-mappings - List mappings with optional filters
pub async fn list_mappings(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MerchantMappingFilter>,
    request: Request,
) -> Result<Json<Vec<MerchantMapping>>, AppError> {
    let user_email = get_user_email(request.headers());

    let mappings = state.db.list_merchant_mappings(&filter)?;

    state.db.log_audit(
        &user_email,
        "list",
        Some("merchant_mapping"),
        None,
        Some(&format!(
            "merchant_name={:?}, app_category={:?}, is_active={:?}, returned={}",
            filter.merchant_name,
            filter.app_category,
            filter.is_active,
            mappings.len()
        )),
    )?;

    Ok(Json(mappings))
}

/// GET /api/merchant-mappings/:id
pub async fn get_mapping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<MerchantMapping>, AppError> {
    let user_email = get_user_email(request.headers());

    let mapping = state
        .db
        .get_merchant_mapping(id)?
        .ok_or_else(|| AppError::not_found("Merchant mapping not found"))?;

    state
        .db
        .log_audit(&user_email, "view", Some("merchant_mapping"), Some(id), None)?;

    Ok(Json(mapping))
}

/// POST /api/merchant-mappings - Create a mapping
pub async fn create_mapping(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<MerchantMapping>), AppError> {
    let user_email = get_user_email(request.headers());
    let req: NewMerchantMapping = read_json(request).await?;

    if req.merchant_name.trim().is_empty() || req.app_category.trim().is_empty() {
        return Err(AppError::bad_request(
            "merchant_name and app_category are required",
        ));
    }

    let mapping = state.db.create_merchant_mapping(&req)?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("merchant_mapping"),
        Some(mapping.id),
        Some(&format!(
            "{} -> {} (priority {})",
            mapping.merchant_name, mapping.app_category, mapping.priority
        )),
    )?;

    Ok((StatusCode::CREATED, Json(mapping)))
}

/// PUT /api/merchant-mappings/:id - Partial update
pub async fn update_mapping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<MerchantMapping>, AppError> {
    let user_email = get_user_email(request.headers());
    let update: MerchantMappingUpdate = read_json(request).await?;

    let mapping = state.db.update_merchant_mapping(id, &update)?;

    state.db.log_audit(
        &user_email,
        "update",
        Some("merchant_mapping"),
        Some(id),
        Some(&format!(
            "{} -> {} (priority {}, active {})",
            mapping.merchant_name, mapping.app_category, mapping.priority, mapping.is_active
        )),
    )?;

    Ok(Json(mapping))
}

/// DELETE /api/merchant-mappings/:id
pub async fn delete_mapping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    state.db.delete_merchant_mapping(id)?;

    state
        .db
        .log_audit(&user_email, "delete", Some("merchant_mapping"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    #[serde(default)]
    pub merchant_name: String,
}

/// POST /api/merchant-mappings/match - Match a merchant name, recording usage
pub async fn match_mapping(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<MappingMatch>, AppError> {
    let user_email = get_user_email(request.headers());
    let req: MatchRequest = read_json(request).await?;

    let result = state.db.match_merchant(&req.merchant_name)?;

    state.db.log_audit(
        &user_email,
        "match",
        Some("merchant_mapping"),
        result.mapping.as_ref().map(|m| m.id),
        Some(&format!(
            "merchant={}, confidence={}",
            req.merchant_name, result.confidence
        )),
    )?;

    Ok(Json(result))
}

/// GET /api/merchant-mappings/stats
pub async fn mapping_stats(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<MappingStats>, AppError> {
    let user_email = get_user_email(request.headers());

    let stats = state.db.mapping_stats()?;

    state
        .db
        .log_audit(&user_email, "view", Some("mapping_stats"), None, None)?;

    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    #[serde(default)]
    pub mappings: Vec<NewMerchantMapping>,
}

/// POST /api/merchant-mappings/bulk-create - Create many, collecting per-item errors
pub async fn bulk_create(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<BulkCreateReport>, AppError> {
    let user_email = get_user_email(request.headers());
    let req: BulkCreateRequest = read_json(request).await?;

    let report = bulk_create_mappings(&state.db, &req.mappings)?;

    state.db.log_audit(
        &user_email,
        "bulk_create",
        Some("merchant_mapping"),
        None,
        Some(&format!(
            "requested={}, created={}, failed={}",
            report.summary.total_requested, report.summary.created, report.summary.failed
        )),
    )?;

    Ok(Json(report))
}

/// POST /api/merchant-mappings/bulk-assign - Point every merchant matching any fragment at one category
pub async fn bulk_assign_mappings(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<BulkAssignReport>, AppError> {
    let user_email = get_user_email(request.headers());
    let req: BulkAssignRequest = read_json(request).await?;

    let report = bulk_assign(&state.db, &req)?;

    state.db.log_audit(
        &user_email,
        "bulk_assign",
        Some("merchant_mapping"),
        None,
        Some(&format!(
            "partial_names={}, app_category={}, created={}, updated={}, transactions={}",
            req.partial_names,
            req.app_category,
            report.mappings_created,
            report.mappings_updated,
            report.transactions_updated
        )),
    )?;

    Ok(Json(report))
}
