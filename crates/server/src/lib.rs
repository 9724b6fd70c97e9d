use api_types::ErrorBody;
use axum::{
    Json,
    extract::rejection::{BytesRejection, JsonRejection, PathRejection},
    http::StatusCode,
    response::IntoResponse,
};
use engine::EngineError;

pub use server::{ServerOptions, ServerState, router, run_with_listener};

mod expense;
mod health;
mod server;

/// Failure of a request, rendered as `{"error": ...}`.
#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    /// The request could not be parsed. The reason is logged, the client
    /// receives the invalid input message.
    Rejection(String),
    /// The path exists but not for this method.
    MethodNotAllowed,
}

/// HTTP status for an error kind.
pub fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::NotFound => StatusCode::NOT_FOUND,
        EngineError::DuplicateConflict => StatusCode::CONFLICT,
        EngineError::InvalidInput => StatusCode::BAD_REQUEST,
        EngineError::Unauthorized => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client facing message for an error kind.
pub fn message_for(err: &EngineError) -> &'static str {
    match err {
        EngineError::NotFound => "Resource not found",
        EngineError::DuplicateConflict => "Username already exists",
        EngineError::InvalidInput => "Invalid input",
        EngineError::Unauthorized => "Unauthorized",
        EngineError::Forbidden => "Forbidden",
        _ => "Internal server error",
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ServerError::Engine(err) => (status_for(&err), message_for(&err)),
            ServerError::Rejection(reason) => {
                tracing::error!("request rejected: {reason}");
                let kind = EngineError::InvalidInput;
                (status_for(&kind), message_for(&kind))
            }
            ServerError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
            }
        };

        let body = ErrorBody {
            error: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::Rejection(value.body_text())
    }
}

impl From<BytesRejection> for ServerError {
    fn from(value: BytesRejection) -> Self {
        Self::Rejection(value.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(value: PathRejection) -> Self {
        Self::Rejection(value.body_text())
    }
}
