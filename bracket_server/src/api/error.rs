//! Mapping of engine errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bracket_engine::tournament::{ErrorKind, TournamentError};
use serde::Serialize;

use crate::{logging, metrics};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Failed API operation
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Convert an engine error raised by `operation`
    ///
    /// Storage failures carry a generic message; the detail only goes to the log.
    pub fn from_engine(operation: &str, err: TournamentError) -> Self {
        let kind = err.kind();
        let status = status_for(kind);

        if kind == ErrorKind::Persistence {
            tracing::error!(operation = operation, "Storage failure: {}", err);
        }
        let message = err.client_message();
        logging::log_rejected_operation(operation, status.as_u16(), &message);
        metrics::operations_rejected_total(kind_label(kind));

        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                success: false,
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::State => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validation",
        ErrorKind::State => "state",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Persistence => "persistence",
    }
}
