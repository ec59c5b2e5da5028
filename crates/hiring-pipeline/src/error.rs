use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::recruitment::{ProcessServiceError, RepositoryError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Process(ProcessServiceError),
    /// Request that deserialized but cannot be interpreted (unknown stage key, malformed id list).
    InvalidRequest(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Process(err) => write!(f, "{}", err),
            AppError::InvalidRequest(message) => write!(f, "invalid request: {}", message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Process(err) => Some(err),
            AppError::InvalidRequest(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Process(ProcessServiceError::IllegalTransition(rejected)) = &self {
            let body = Json(json!({
                "error": self.to_string(),
                "current": rejected.from,
                "requested": rejected.to,
                "allowed": rejected.allowed,
            }));
            return (StatusCode::CONFLICT, body).into_response();
        }

        let status = match &self {
            AppError::Process(err) => process_status(err),
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

fn process_status(err: &ProcessServiceError) -> StatusCode {
    match err {
        ProcessServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ProcessServiceError::IllegalTransition(_)
        | ProcessServiceError::DuplicateProcess { .. }
        | ProcessServiceError::NotCancellable { .. } => StatusCode::CONFLICT,
        ProcessServiceError::Repository(
            RepositoryError::Unavailable(_) | RepositoryError::VersionConflict,
        ) => StatusCode::SERVICE_UNAVAILABLE,
        ProcessServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ProcessServiceError> for AppError {
    fn from(value: ProcessServiceError) -> Self {
        Self::Process(value)
    }
}
