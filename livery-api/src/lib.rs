use axum::{extract::State, http::Method, routing::get, Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod earnings;
pub mod error;
pub mod fleet;
pub mod locations;
pub mod metrics;
pub mod middleware;
pub mod state;
pub mod stream;
pub mod trips;
pub mod worker;

pub use state::AppState;

use crate::error::AppError;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .nest("/v1/auth", auth::routes())
        .nest("/v1/trips", trips::routes(state.clone()))
        .nest("/v1/earnings", earnings::routes(state.clone()))
        .nest("/v1/fleet", fleet::routes(state.clone()))
        .nest("/v1/riders", fleet::rider_routes(state.clone()))
        .nest("/v1/locations", locations::routes(state.clone()))
        .nest("/v1/stream", stream::routes(state.clone()))
        .route("/health", get(health))
        .route("/metrics", get(export_metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Prometheus scrape endpoint. Sync engine gauges are sampled here so
/// the exported numbers always reflect the engine's own counters.
async fn export_metrics(State(state): State<AppState>) -> Result<String, AppError> {
    let snap = state.sync.snapshot().await;
    state.metrics.sync_snapshot_version.set(snap.version as i64);
    state
        .metrics
        .sync_refetches_discarded
        .set(state.sync.discarded_refetches() as i64);
    state
        .metrics
        .sync_refetches_failed
        .set(state.sync.failed_refetches() as i64);

    state
        .metrics
        .export()
        .map_err(|e| AppError::InternalServerError(format!("Metrics encoding failed: {}", e)))
}
