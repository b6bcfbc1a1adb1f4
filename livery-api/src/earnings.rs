use axum::{
    extract::{Query, State},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use livery_trip::earnings::{summarize, wallet_statement, EarningsSummary, WalletStatement};
use livery_trip::{EarningsFilter, WalletWindow};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::auth::{boss_auth_middleware, driver_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    #[serde(default = "default_window")]
    pub window: WalletWindow,
}

fn default_window() -> WalletWindow {
    WalletWindow::Week
}

pub fn routes(state: AppState) -> Router<AppState> {
    let boss = Router::new()
        .route("/summary", get(earnings_summary))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            boss_auth_middleware,
        ));

    let driver = Router::new()
        .route("/wallet", get(driver_wallet))
        .route_layer(middleware::from_fn_with_state(
            state,
            driver_auth_middleware,
        ));

    Router::new().merge(boss).merge(driver)
}

/// GET /v1/earnings/summary?from=&to=&driver_id=
/// Dispatcher earnings table over completed trips, derived from the
/// current snapshot.
async fn earnings_summary(
    State(state): State<AppState>,
    Query(filter): Query<EarningsFilter>,
) -> Result<Json<EarningsSummary>, AppError> {
    let snap = state.sync.snapshot().await;
    Ok(Json(summarize(
        &snap.trips,
        &snap.events_by_trip,
        &snap.users_by_id,
        &filter,
    )))
}

/// GET /v1/earnings/wallet?window=week|month|year
async fn driver_wallet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<WalletQuery>,
) -> Result<Json<WalletStatement>, AppError> {
    let driver_id = claims.user_id()?;

    // The rate comes off the live user row so a raise applies immediately
    let driver = state
        .users
        .get_user(driver_id)
        .await
        .map_err(AppError::from_repo)?
        .ok_or_else(|| AppError::NotFoundError(format!("Driver {} not found", driver_id)))?;

    let snap = state.sync.snapshot().await;
    Ok(Json(wallet_statement(
        &driver,
        &snap.trips,
        &snap.events_by_trip,
        query.window,
        Utc::now(),
    )))
}
