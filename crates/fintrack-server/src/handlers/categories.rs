//! Category handlers: structured overrides, backfill, stats and resolution

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{get_user_email, read_json, AppError, AppState};
use fintrack_core::categorize::{app_categories, raw_categories_for};
use fintrack_core::models::{CategoryMapping, CategoryStats, NewCategoryMapping};
use fintrack_core::{CategoryInput, CategoryResolver, Resolution};

/// GET /api/categories - All category mappings
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<CategoryMapping>>, AppError> {
    let user_email = get_user_email(request.headers());

    let mappings = state.db.list_category_mappings()?;

    state.db.log_audit(
        &user_email,
        "list",
        Some("category_mapping"),
        None,
        Some(&format!("count={}", mappings.len())),
    )?;

    Ok(Json(mappings))
}

/// POST /api/categories - Upsert by raw category, or create a structured override
///
/// A body carrying only `plaid_category` and `app_category` updates the
/// existing row for that raw category.
pub async fn set_category_mapping(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<CategoryMapping>, AppError> {
    let user_email = get_user_email(request.headers());
    let req: NewCategoryMapping = read_json(request).await?;

    let structured =
        req.personal_finance_primary.is_some() || req.personal_finance_detailed.is_some();
    let (action, mapping) = match req.plaid_category.as_deref() {
        Some(plaid) if !structured => (
            "upsert",
            state
                .db
                .upsert_plaid_category_mapping(plaid, &req.app_category)?,
        ),
        _ => ("create", state.db.create_category_mapping(&req)?),
    };

    state.db.log_audit(
        &user_email,
        action,
        Some("category_mapping"),
        Some(mapping.id),
        Some(&format!(
            "plaid={:?}, primary={:?}, detailed={:?} -> {}",
            mapping.plaid_category,
            mapping.personal_finance_primary,
            mapping.personal_finance_detailed,
            mapping.app_category
        )),
    )?;

    Ok(Json(mapping))
}

#[derive(Debug, Deserialize)]
pub struct DeleteCategoryQuery {
    pub plaid_category: Option<String>,
    pub id: Option<i64>,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

/// DELETE /api/categories?plaid_category=... or ?id=...
pub async fn delete_category_mapping(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DeleteCategoryQuery>,
    request: Request,
) -> Result<Json<DeletedResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    let deleted = match (params.plaid_category.as_deref(), params.id) {
        (Some(plaid), _) if !plaid.trim().is_empty() => {
            state.db.delete_category_mapping_by_plaid(plaid)?
        }
        (_, Some(id)) => {
            state.db.delete_category_mapping(id)?;
            1
        }
        _ => return Err(AppError::bad_request("plaid_category or id is required")),
    };

    state.db.log_audit(
        &user_email,
        "delete",
        Some("category_mapping"),
        params.id,
        Some(&format!(
            "plaid_category={:?}, deleted={}",
            params.plaid_category, deleted
        )),
    )?;

    Ok(Json(DeletedResponse { deleted }))
}

#[derive(Serialize)]
pub struct UpdatedResponse {
    pub updated: usize,
}

/// POST /api/categories/backfill
pub async fn backfill_categories(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<UpdatedResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    let updated = state.db.backfill_categories()?;

    state.db.log_audit(
        &user_email,
        "backfill",
        Some("transaction"),
        None,
        Some(&format!("updated={}", updated)),
    )?;

    Ok(Json(UpdatedResponse { updated }))
}

/// GET /api/categories/stats
pub async fn category_stats(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<CategoryStats>, AppError> {
    let user_email = get_user_email(request.headers());

    let stats = state.db.category_stats()?;

    state
        .db
        .log_audit(&user_email, "view", Some("category_stats"), None, None)?;

    Ok(Json(stats))
}

/// An app category with the raw codes that resolve to it
#[derive(Serialize)]
pub struct AppCategoryInfo {
    pub app_category: &'static str,
    pub raw_categories: Vec<&'static str>,
}

/// GET /api/categories/app - Budgeting categories known to the static table
pub async fn list_app_categories(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<AppCategoryInfo>>, AppError> {
    let user_email = get_user_email(request.headers());

    let categories: Vec<AppCategoryInfo> = app_categories()
        .into_iter()
        .map(|app_category| AppCategoryInfo {
            app_category,
            raw_categories: raw_categories_for(app_category),
        })
        .collect();

    state.db.log_audit(
        &user_email,
        "list",
        Some("app_category"),
        None,
        Some(&format!("count={}", categories.len())),
    )?;

    Ok(Json(categories))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(flatten)]
    pub input: CategoryInput,
    /// Resolve without recording usage or learning
    #[serde(default)]
    pub dry_run: bool,
}

/// POST /api/categories/resolve - Run the categorization pipeline
pub async fn resolve_category(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Resolution>, AppError> {
    let user_email = get_user_email(request.headers());
    let req: ResolveRequest = read_json(request).await?;

    let resolver = CategoryResolver::new(&state.db);
    let resolution = if req.dry_run {
        resolver.resolve(&req.input)?
    } else {
        resolver.categorize(&req.input)?
    };

    state.db.log_audit(
        &user_email,
        "resolve",
        Some("category"),
        None,
        Some(&format!(
            "merchant={:?} -> {} ({:?}, dry_run={})",
            req.input.merchant(),
            resolution.category,
            resolution.source,
            req.dry_run
        )),
    )?;

    Ok(Json(resolution))
}
