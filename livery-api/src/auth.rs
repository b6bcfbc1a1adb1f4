use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use livery_fleet::User;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// POST /v1/auth/login
/// Mints a role-scoped token for a known account. Credential handling
/// lives with the identity provider, not here.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .users
        .find_by_email(req.email.trim())
        .await
        .map_err(AppError::from_repo)?
        .ok_or_else(|| AppError::AuthenticationError("Unknown account".to_string()))?;

    let claims = Claims {
        sub: user.id.to_string(),
        name: user.name.clone(),
        role: user.role.as_str().to_string(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))?;

    info!(user_id = %user.id, role = %user.role, "Login");

    Ok(Json(AuthResponse { token, user }))
}
