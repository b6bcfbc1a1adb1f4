use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use livery_core::CoreError;
use livery_fleet::FleetError;
use livery_trip::TripError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    /// Map a boxed repository error onto an HTTP-shaped one. Transition
    /// rejections surface as 409 so clients refetch and retry; anything
    /// unrecognized stays a 500.
    pub fn from_repo(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        let err = match err.downcast::<TripError>() {
            Ok(trip_err) => return Self::from_trip(*trip_err),
            Err(err) => err,
        };
        let err = match err.downcast::<FleetError>() {
            Ok(fleet_err) => return AppError::ValidationError(fleet_err.to_string()),
            Err(err) => err,
        };
        match err.downcast::<CoreError>() {
            Ok(core_err) => match *core_err {
                CoreError::NotFound(msg) => AppError::NotFoundError(msg),
                CoreError::ValidationError(msg) => AppError::ValidationError(msg),
                CoreError::InternalError(msg) => AppError::InternalServerError(msg),
            },
            Err(err) => AppError::InternalServerError(err.to_string()),
        }
    }

    fn from_trip(err: TripError) -> Self {
        match err {
            TripError::NotFound(msg) => AppError::NotFoundError(msg),
            TripError::InvalidDraft(msg) => AppError::ValidationError(msg),
            e @ (TripError::InvalidTransition { .. }
            | TripError::AlreadyStarted
            | TripError::PickupAlreadyRecorded
            | TripError::NoDriverAssigned
            | TripError::WrongDriver(_)) => AppError::ConflictError(e.to_string()),
            e @ (TripError::UnknownStatus(_) | TripError::UnknownEventType(_)) => {
                AppError::InternalServerError(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
