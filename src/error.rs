use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the Skyrelay application
#[derive(Error, Debug)]
pub enum RelayError {
    // Upgrade errors
    #[error("WebSocket upgrade failed: {0}")]
    Upgrade(String),

    #[error("Origin rejected: {origin}")]
    OriginRejected { origin: String },

    // Connection errors
    #[error("Read failed: {0}")]
    Read(String),

    #[error("Message too large: {size} bytes (limit {limit})")]
    OversizedMessage { size: usize, limit: usize },

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Write deadline exceeded")]
    WriteTimeout,

    #[error("No liveness acknowledgment within timeout")]
    LivenessExpired,

    // Telemetry errors
    #[error("Telemetry source error: {0}")]
    TelemetrySource(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // TLS errors
    #[error("Certificate error: {0}")]
    Certificate(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Skyrelay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            RelayError::Upgrade(_) | RelayError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 403 Forbidden
            RelayError::OriginRejected { .. } => StatusCode::FORBIDDEN,

            // 413 Payload Too Large
            RelayError::OversizedMessage { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 504 Gateway Timeout
            RelayError::WriteTimeout | RelayError::LivenessExpired => StatusCode::GATEWAY_TIMEOUT,

            // 500 Internal Server Error
            RelayError::Read(_)
            | RelayError::Write(_)
            | RelayError::TelemetrySource(_)
            | RelayError::Serialization(_)
            | RelayError::Certificate(_)
            | RelayError::Io(_)
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// Implement IntoResponse for handler-facing error responses
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

// Convert from axum WebSocket errors
impl From<axum::Error> for RelayError {
    fn from(err: axum::Error) -> Self {
        RelayError::Read(err.to_string())
    }
}
