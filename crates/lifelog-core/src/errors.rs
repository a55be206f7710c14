// ABOUTME: Unified error type with stable error codes for every layer of the server
// ABOUTME: Provides constructors per category and an optional structured HTTP payload
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

//! Unified error handling
//!
//! Every fallible operation in the workspace returns [`AppResult`]. The
//! [`ErrorCode`] is the stable, machine-readable category exposed to callers;
//! the message is human-readable; `details` carries diagnostics that are only
//! rendered outside production.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable error categories exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A field carried an invalid value
    InvalidInput,
    /// A required field was absent
    MissingRequiredField,
    /// The record does not exist for this caller
    ResourceNotFound,
    /// Caller identity missing or rejected
    AuthInvalid,
    /// Neither store could serve the operation
    StorageUnavailable,
    /// A single store reported an error
    DatabaseError,
    /// An upstream service (LLM, file storage) failed
    ExternalServiceError,
    /// Configuration is missing or malformed
    ConfigError,
    /// Unexpected internal failure
    InternalError,
}

impl ErrorCode {
    /// HTTP status code conventionally associated with this category
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput | Self::MissingRequiredField => 400,
            Self::AuthInvalid => 401,
            Self::ResourceNotFound => 404,
            Self::ExternalServiceError => 502,
            Self::StorageUnavailable => 503,
            Self::DatabaseError | Self::ConfigError | Self::InternalError => 500,
        }
    }

    /// Machine-readable identifier (matches the serde representation)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::MissingRequiredField => "missing_required_field",
            Self::ResourceNotFound => "resource_not_found",
            Self::AuthInvalid => "auth_invalid",
            Self::StorageUnavailable => "storage_unavailable",
            Self::DatabaseError => "database_error",
            Self::ExternalServiceError => "external_service_error",
            Self::ConfigError => "config_error",
            Self::InternalError => "internal_error",
        }
    }

    /// Whether this category is a client mistake rather than a server fault
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(
            self,
            Self::InvalidInput
                | Self::MissingRequiredField
                | Self::ResourceNotFound
                | Self::AuthInvalid
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error carrying a stable category and a readable message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AppError {
    /// Stable category
    pub code: ErrorCode,
    /// Human-readable message, safe to show to the caller
    pub message: String,
    /// Internal diagnostics, only exposed in development mode
    pub details: Option<String>,
}

/// Result alias used across the workspace
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create an error with an explicit code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach diagnostic details
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Invalid field value
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Required field missing
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Missing required field: {field}"),
        )
    }

    /// Record not found for the caller
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Caller identity rejected
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Single store failure
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// No store could serve the request
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageUnavailable, message)
    }

    /// Upstream service failure
    pub fn external_service(service: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{service}: {}", message.into()),
        )
    }

    /// Configuration failure
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Unexpected failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Convert into the serializable payload, dropping details unless requested
    #[must_use]
    pub fn to_response(&self, include_details: bool) -> ErrorResponse {
        ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message.clone(),
                details: if include_details {
                    self.details.clone()
                } else {
                    None
                },
            },
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal("JSON serialization failed").with_details(err.to_string())
    }
}

/// Structured error payload rendered to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error body
    pub error: ErrorBody,
}

/// Body of [`ErrorResponse`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable category
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Diagnostics (development mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Whether diagnostics may be exposed (`LIFELOG_ENV=development`)
#[must_use]
pub fn development_mode() -> bool {
    env::var("LIFELOG_ENV").is_ok_and(|v| v.eq_ignore_ascii_case("development"))
}

#[cfg(feature = "http-response")]
mod http {
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;

    use super::{development_mode, AppError};

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.code.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(self.to_response(development_mode()))).into_response()
        }
    }

}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_category() {
        assert_eq!(ErrorCode::InvalidInput.http_status(), 400);
        assert_eq!(ErrorCode::MissingRequiredField.http_status(), 400);
        assert_eq!(ErrorCode::ResourceNotFound.http_status(), 404);
        assert_eq!(ErrorCode::StorageUnavailable.http_status(), 503);
        assert_eq!(ErrorCode::ExternalServiceError.http_status(), 502);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn serde_name_matches_as_str() {
        for code in [
            ErrorCode::InvalidInput,
            ErrorCode::ResourceNotFound,
            ErrorCode::StorageUnavailable,
            ErrorCode::ExternalServiceError,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn details_hidden_unless_requested() {
        let err = AppError::storage_unavailable("storage failure").with_details("disk full");
        let public = err.to_response(false);
        assert!(public.error.details.is_none());
        let dev = err.to_response(true);
        assert_eq!(dev.error.details.as_deref(), Some("disk full"));

        let body = serde_json::to_value(&public).unwrap();
        assert_eq!(body["error"]["code"], "storage_unavailable");
        assert!(body["error"].get("details").is_none());
    }

    #[test]
    fn missing_field_names_the_field() {
        let err = AppError::missing_field("content");
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        assert!(err.message.contains("content"));
        assert!(err.to_string().starts_with("missing_required_field"));
    }
}
