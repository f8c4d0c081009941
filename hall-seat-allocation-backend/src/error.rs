use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hall_seat_allocation_config::ConfigError;
use hall_seat_allocation_core::{HallError, LayoutError};
use hall_seat_allocation_database::DatabaseError;
use http::StatusCode;
use serde::Serialize;
use tracing::error;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Hall(#[from] HallError),
    #[error("malformed request body: {0}")]
    Json(#[from] JsonRejection),
    #[error("malformed path: {0}")]
    Path(#[from] PathRejection),
    #[error("malformed query: {0}")]
    Query(#[from] QueryRejection),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("invalid hall layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("IO error: {0}")]
    File(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    detail: String,
}

impl AppError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Hall(err) => err.kind(),
            Self::Json(_) | Self::Path(_) | Self::Query(_) => "malformed_request",
            Self::Config(_) | Self::Layout(_) | Self::Database(_) | Self::File(_) => {
                "internal_error"
            }
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Hall(
                HallError::InvalidAddress { .. }
                | HallError::InvalidFloor { .. }
                | HallError::InvalidTransition { .. }
                | HallError::Validation(_),
            )
            | Self::Json(_)
            | Self::Path(_)
            | Self::Query(_) => StatusCode::BAD_REQUEST,
            Self::Hall(HallError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Hall(
                HallError::ApplicationNotApproved { .. }
                | HallError::ApplicationAlreadyAllocated { .. }
                | HallError::SeatAlreadyOccupied { .. }
                | HallError::StaleWrite { .. },
            ) => StatusCode::CONFLICT,
            Self::Hall(HallError::Storage(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) | Self::Layout(_) | Self::Database(_) | Self::File(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), "request failed: {self}");
        }
        let body = ErrorBody {
            kind: self.kind(),
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
