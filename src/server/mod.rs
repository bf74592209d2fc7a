pub mod error;
mod health;
pub mod identity;
pub mod rate_limit;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer};

use crate::{analytics, imaging, medications, ocr, users, AppState};

const ENABLE_LOGS: bool = true;

use crate::log_info;

// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub use error::{ApiError, ApiResponse, ApiResult};

/// Every route of the API, wrapped in the shared middleware stack.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .settings
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/api/health", get(health::health_check))
        .route(
            "/api/medications",
            get(medications::handlers::list_medications)
                .post(medications::handlers::create_medication),
        )
        .route("/api/medications/logs", get(medications::handlers::list_logs))
        .route(
            "/api/medications/{id}",
            put(medications::handlers::update_medication)
                .delete(medications::handlers::delete_medication),
        )
        .route("/api/medications/{id}/log", post(medications::handlers::log_dose))
        .route("/api/users/profile", get(users::handlers::profile))
        .route("/api/users/stats", get(users::handlers::stats))
        .route(
            "/api/analytics/summary",
            get(analytics::handlers::adherence_summary),
        )
        .route("/api/ocr/process-image", post(ocr::handlers::process_image))
        .route("/api/images/optimize", post(imaging::handlers::optimize_image))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_requests,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}

/// Serves on an already bound listener until `shutdown` is cancelled.
pub async fn serve(listener: TcpListener, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let local_addr = listener
        .local_addr()
        .context("Failed to read listener address")?;
    log_info!("Server running on {local_addr}");
    log_info!("Health check: http://{local_addr}/api/health");

    let app = build_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .context("HTTP server failed")
}
