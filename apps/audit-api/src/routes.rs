//! HTTP transport for the audit service.
//!
//! Two routing conventions reach the same handlers: path style
//! (`GET /api/audit/summary`) and query style (`GET /api/audit?action=summary`).

use std::net::SocketAddr;

use audit_aggregate::{Stats, Summary};
use audit_model::{AuditError, Event, RequestContext};
use audit_service::AuditService;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, REFERER, USER_AGENT};
use axum::http::{Extensions, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::openapi::openapi_spec;

#[derive(Clone)]
pub struct AppState {
    pub service: AuditService,
}

#[derive(Debug, Deserialize, Default)]
pub struct ActionQuery {
    action: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "method not allowed".to_owned(),
        }
    }
}

impl From<AuditError> for ApiError {
    fn from(error: AuditError) -> Self {
        let status = match &error {
            AuditError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            AuditError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuditError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(%error, "audit request failed");
        }
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/openapi.json", get(openapi_json))
        .route(
            "/api/audit",
            get(dispatch_get).post(create_event).delete(dispatch_delete),
        )
        .route("/api/audit/events", get(list_events))
        .route("/api/audit/summary", get(get_summary))
        .route("/api/audit/stats", get(get_stats))
        .route("/api/audit/export", get(export_events))
        .route("/api/audit/clear", delete(clear_events))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "audit-api"
    }))
}

async fn openapi_json() -> Json<serde_json::Value> {
    Json(openapi_spec())
}

async fn dispatch_get(
    State(state): State<AppState>,
    Query(query): Query<ActionQuery>,
) -> ApiResult<Response> {
    let response = match query.action.as_deref() {
        None | Some("") => info(State(state)).await.into_response(),
        Some("events") => list_events(State(state)).await.into_response(),
        Some("summary") => get_summary(State(state)).await.into_response(),
        Some("stats") => get_stats(State(state)).await.into_response(),
        Some("export") => export_events(State(state)).await?,
        Some(other) => return Err(ApiError::not_found(format!("unknown action: {other}"))),
    };
    Ok(response)
}

async fn dispatch_delete(
    State(state): State<AppState>,
    Query(query): Query<ActionQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    match query.action.as_deref() {
        Some("clear") => clear_events(State(state)).await,
        _ => Err(ApiError::method_not_allowed()),
    }
}

async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "Audit API",
        "currentEvents": state.service.count().await,
        "capacity": state.service.capacity(),
        "endpoints": {
            "POST /api/audit": "Log event",
            "GET /api/audit/events": "All events, newest first (?action=events)",
            "GET /api/audit/summary": "Totals, unique visitors, events by type (?action=summary)",
            "GET /api/audit/stats": "Extended statistics (?action=stats)",
            "GET /api/audit/export": "Download the log, oldest first (?action=export)",
            "DELETE /api/audit/clear": "Clear all events (?action=clear)",
        },
    }))
}

async fn create_event(
    State(state): State<AppState>,
    Query(query): Query<ActionQuery>,
    headers: HeaderMap,
    extensions: Extensions,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    // Every action names a read or a clear; none of them accepts a submission.
    if query.action.as_deref().is_some_and(|action| !action.is_empty()) {
        return Err(ApiError::method_not_allowed());
    }
    let ctx = request_context(&headers, &extensions);
    state.service.record(&body, &ctx).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Event logged",
        "total": state.service.count().await,
    })))
}

async fn list_events(State(state): State<AppState>) -> Json<Vec<Event>> {
    Json(state.service.events_newest_first().await)
}

async fn get_summary(State(state): State<AppState>) -> Json<Summary> {
    Json(state.service.summary().await)
}

async fn get_stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.service.stats().await)
}

async fn export_events(State(state): State<AppState>) -> ApiResult<Response> {
    let events = state.service.export().await;
    let body = serde_json::to_string_pretty(&events)
        .map_err(|error| ApiError::from(AuditError::unavailable(error)))?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=audit-logs.json"),
    );
    Ok((headers, body).into_response())
}

async fn clear_events(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    state.service.clear().await?;
    Ok(Json(json!({
        "success": true,
        "message": "All data cleared",
    })))
}

/// Builds the transport-agnostic request view from raw headers and the
/// connection info attached by `into_make_service_with_connect_info`.
///
/// Header bytes outside visible ASCII are decoded lossily rather than dropped.
fn request_context(headers: &HeaderMap, extensions: &Extensions) -> RequestContext {
    let header = |name: &str| {
        headers
            .get(name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
    };

    RequestContext {
        forwarded_for: header("x-forwarded-for"),
        real_ip: header("x-real-ip"),
        peer_addr: extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip()),
        user_agent: header(USER_AGENT.as_str()),
        referer: header(REFERER.as_str()).or_else(|| header("referrer")),
    }
}
