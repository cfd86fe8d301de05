//! Error types for ClinBridge services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for each failure mode of a forwarded request
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,

    // Upstream workflow errors (8xxx)
    UpstreamError,
    UpstreamStatus,
    UpstreamTimeout,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    // Service unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,

            // Upstream (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::UpstreamStatus => 8002,
            ErrorCode::UpstreamTimeout => 8003,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Upstream workflow errors. Nothing is retried; every failure is
    // terminal for the invocation and reported verbatim.
    #[error("Workflow request failed: {message}")]
    Upstream { message: String },

    #[error("Workflow returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Workflow timed out after {timeout_secs}s")]
    UpstreamTimeout { timeout_secs: u64 },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::UpstreamStatus { .. } => ErrorCode::UpstreamStatus,
            AppError::UpstreamTimeout { .. } => ErrorCode::UpstreamTimeout,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } |
            AppError::MissingField { .. } |
            AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Upstream { .. } |
            AppError::UpstreamStatus { .. } |
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 504 Gateway Timeout
            AppError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,

            // 503 Service Unavailable
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        // Upstream status and body travel unaltered so the caller can
        // inspect what the remote service actually said.
        let details = match &self {
            AppError::UpstreamStatus { status, body } => Some(serde_json::json!({
                "upstream_status": status,
                "upstream_body": body,
            })),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::UpstreamTimeout { timeout_secs: 90 };
        assert_eq!(err.code(), ErrorCode::UpstreamTimeout);
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "question must not be empty".into(),
            field: Some("question".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_upstream_status_carries_body_verbatim() {
        let err = AppError::UpstreamStatus {
            status: 404,
            body: r#"{"code":"workflow_not_found"}"#.into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains(r#"{"code":"workflow_not_found"}"#));
    }

    #[test]
    fn test_configuration_error_is_server_error() {
        let err = AppError::Configuration {
            message: "workflow.api_key is not set".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }
}
