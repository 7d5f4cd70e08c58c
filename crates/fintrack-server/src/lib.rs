//! Fintrack Web Server
//!
//! Axum-based REST API over the fintrack core library.
//!
//! Security features:
//! - API key authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (pagination limits, body size limits)
//! - Audit logging for all API access (reads and writes)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use fintrack_core::{Database, TransactionFilterConfig};

mod handlers;

/// Maximum JSON request body (ingestion batches included)
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Environment variable holding comma-separated API keys
pub const API_KEYS_ENV: &str = "FINTRACK_API_KEYS";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Accepted keys, sent as "Bearer <key>" in the Authorization header
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

/// Split a comma-separated key list, dropping blanks
pub fn parse_api_keys(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Date filter used by ingestion; replaced through the config endpoint
    pub filter: RwLock<TransactionFilterConfig>,
}

/// Authentication middleware - validates API keys
///
/// Keys are compared in constant time.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    let api_key_valid = bearer_token(request.headers())
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        info!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Validate an API key against the configured keys using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();
    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        // ct_eq is only constant-time for equal lengths
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Identity recorded in the audit log: "api-key" or "local-dev"
pub fn get_user_email(headers: &axum::http::HeaderMap) -> String {
    if bearer_token(headers).is_some() {
        return "api-key".to_string();
    }
    "local-dev".to_string()
}

/// Read a JSON body, answering 400 for anything unparseable
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::bad_request(&format!("Invalid JSON: {}", e)))
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig, filter: TransactionFilterConfig) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        filter: RwLock::new(filter),
    });

    let api_routes = Router::new()
        // Merchant mappings
        .route(
            "/merchant-mappings",
            get(handlers::list_mappings).post(handlers::create_mapping),
        )
        .route("/merchant-mappings/match", post(handlers::match_mapping))
        .route("/merchant-mappings/stats", get(handlers::mapping_stats))
        .route(
            "/merchant-mappings/bulk-create",
            post(handlers::bulk_create),
        )
        .route(
            "/merchant-mappings/bulk-assign",
            post(handlers::bulk_assign_mappings),
        )
        .route(
            "/merchant-mappings/:id",
            get(handlers::get_mapping)
                .put(handlers::update_mapping)
                .delete(handlers::delete_mapping),
        )
        // Structured category mappings
        .route(
            "/categories",
            get(handlers::list_categories)
                .post(handlers::set_category_mapping)
                .delete(handlers::delete_category_mapping),
        )
        .route("/categories/backfill", post(handlers::backfill_categories))
        .route("/categories/stats", get(handlers::category_stats))
        .route("/categories/app", get(handlers::list_app_categories))
        .route("/categories/resolve", post(handlers::resolve_category))
        // Recurring
        .route(
            "/recurring/rules",
            get(handlers::list_recurring_rules).post(handlers::create_recurring_rule),
        )
        .route(
            "/recurring/rules/:id",
            axum::routing::put(handlers::update_recurring_rule)
                .delete(handlers::delete_recurring_rule),
        )
        .route("/recurring/patterns", get(handlers::recurring_patterns))
        .route(
            "/recurring/apply_rules",
            post(handlers::apply_recurring_rules),
        )
        // Merchant category rules
        .route(
            "/merchant-rules",
            get(handlers::list_merchant_rules).post(handlers::create_merchant_rule),
        )
        .route(
            "/merchant-rules/apply",
            post(handlers::apply_merchant_rules),
        )
        .route(
            "/merchant-rules/:id",
            axum::routing::put(handlers::update_merchant_rule)
                .delete(handlers::delete_merchant_rule),
        )
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/transactions/summary",
            get(handlers::transaction_summary),
        )
        .route("/transactions/ingest", post(handlers::ingest_transactions))
        .route(
            "/transactions/:id",
            get(handlers::get_transaction).delete(handlers::delete_transaction),
        )
        .route(
            "/transactions/:id/category",
            post(handlers::set_transaction_category),
        )
        .route("/transactions/:id/type", post(handlers::set_transaction_type))
        .route(
            "/transactions/:id/recurrence",
            post(handlers::set_transaction_recurrence),
        )
        // Configuration
        .route(
            "/config/transaction-filter",
            get(handlers::get_filter_config).put(handlers::update_filter_config),
        )
        // Audit log
        .route("/audit", get(handlers::list_audit_log));

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
    filter: TransactionFilterConfig,
) -> anyhow::Result<()> {
    if config.require_auth && config.api_keys.is_empty() {
        warn!(
            "Authentication is required but {} is empty; every request will be rejected",
            API_KEYS_ENV
        );
    }
    info!(
        date_filtering = filter.enable_date_filtering,
        start_date = ?filter.default_start_date,
        "Transaction filter loaded"
    );

    let app = create_router(db, config, filter);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<fintrack_core::Error> for AppError {
    fn from(err: fintrack_core::Error) -> Self {
        use fintrack_core::Error;

        match err {
            Error::InvalidData(msg) | Error::Config(msg) => Self::bad_request(&msg),
            Error::Regex(e) => Self::bad_request(&format!("Invalid pattern: {}", e)),
            Error::NotFound(msg) => Self::not_found(&format!("Not found: {}", msg)),
            Error::Conflict(msg) => Self::conflict(&msg),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                internal: Some(anyhow::Error::new(other)),
            },
        }
    }
}
