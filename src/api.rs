// 🌐 HTTP API - resolver + classifier over JSON
//
// Routes are mounted under /api by `router`:
// GET  /health            liveness
// GET  /resolve/:label    single label (percent-encoded path segment)
// POST /resolve           {"labels": [...]}
// POST /classify          {"aggregates": [...]}
// GET  /config            active configuration

use crate::audit::AuditOrchestrator;
use crate::classifier::ClassificationRecord;
use crate::config::AuditConfig;
use crate::features::EntityAggregate;
use crate::resolver::ResolutionRecord;
use crate::summary::{ClassificationSummary, ResolutionSummary};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AuditOrchestrator>,
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub labels: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub records: Vec<ResolutionRecord>,
    pub summary: ResolutionSummary,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub aggregates: Vec<EntityAggregate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub records: Vec<ClassificationRecord>,
    pub summary: ClassificationSummary,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/resolve/:label - Resolve one label
async fn resolve_one(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> impl IntoResponse {
    // Path has already percent-decoded the segment exactly once
    let record = state.orchestrator.resolver().resolve(&label);
    (StatusCode::OK, Json(ApiResponse::ok(record)))
}

/// POST /api/resolve - Resolve a batch, order preserved
async fn resolve_many(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> impl IntoResponse {
    let records = state.orchestrator.resolver().resolve_batch(&request.labels);
    let summary = ResolutionSummary::from_records(&records);
    (
        StatusCode::OK,
        Json(ApiResponse::ok(ResolveResponse { records, summary })),
    )
}

/// POST /api/classify - Classify one population of aggregates
async fn classify(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> impl IntoResponse {
    match state.orchestrator.classify(&request.aggregates) {
        Ok(records) => {
            let summary = ClassificationSummary::from_records(&records);
            (
                StatusCode::OK,
                Json(ApiResponse::ok(ClassifyResponse { records, summary })),
            )
        }
        Err(e) => {
            warn!(error = %e, "rejected classification batch");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::err(e.to_string())),
            )
        }
    }
}

/// GET /api/config - Active configuration
async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::<AuditConfig>::ok(state.orchestrator.config().clone()))
}

// ============================================================================
// Router
// ============================================================================

/// API routes, nested under /api
pub fn router(orchestrator: Arc<AuditOrchestrator>) -> Router {
    let state = AppState { orchestrator };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/resolve/:label", get(resolve_one))
        .route("/resolve", post(resolve_many))
        .route("/classify", post(classify))
        .route("/config", get(get_config))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}
