//! Unified application error types for AppHost.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Startup kinds (`PluginNotFound`,
//! `PluginAttach`, `PluginInit`) are fatal; call kinds (`CallNotFound`,
//! `Hook`, `Operation`) are returned to the invoking caller only.

use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (duplicate registration, etc.).
    Conflict,
    /// An internal error occurred.
    Internal,
    /// A configuration error occurred.
    Configuration,
    /// A database error occurred.
    Database,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// Template loading or rendering failed.
    Template,
    /// No resolution strategy produced the requested plugin.
    PluginNotFound,
    /// A plugin failed during its attach phase.
    PluginAttach,
    /// A plugin failed during its init phase.
    PluginInit,
    /// No call handler is registered under the requested name.
    CallNotFound,
    /// A before/after hook reported a failure.
    Hook,
    /// A call handler reported a failure.
    Operation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Database => write!(f, "DATABASE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Template => write!(f, "TEMPLATE"),
            Self::PluginNotFound => write!(f, "PLUGIN_NOT_FOUND"),
            Self::PluginAttach => write!(f, "PLUGIN_ATTACH"),
            Self::PluginInit => write!(f, "PLUGIN_INIT"),
            Self::CallNotFound => write!(f, "CALL_NOT_FOUND"),
            Self::Hook => write!(f, "HOOK"),
            Self::Operation => write!(f, "OPERATION"),
        }
    }
}

/// The unified application error used throughout AppHost.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a template error caused by the template engine.
    pub fn template(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::with_source(ErrorKind::Template, message, source)
    }

    /// Create a plugin-not-found error.
    pub fn plugin_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PluginNotFound, message)
    }

    /// Wraps the error a plugin returned from `attach`.
    pub fn plugin_attach(plugin: &str, cause: AppError) -> Self {
        let message = format!("Plugin '{plugin}' failed to attach: {}", cause.message);
        Self::with_source(ErrorKind::PluginAttach, message, cause)
    }

    /// Wraps the error a plugin returned from `init`.
    pub fn plugin_init(plugin: &str, cause: AppError) -> Self {
        let message = format!("Plugin '{plugin}' failed to initialize: {}", cause.message);
        Self::with_source(ErrorKind::PluginInit, message, cause)
    }

    /// Create a call-not-found error.
    pub fn call_not_found(name: &str) -> Self {
        Self::new(ErrorKind::CallNotFound, format!("Cannot call '{name}'"))
    }

    /// Create a hook error. Hook implementations return this to abort a call.
    pub fn hook(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Hook, message)
    }

    /// Create an operation error. Call handlers return this on failure.
    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Operation, message)
    }

    /// Returns whether this error must stop the host from serving.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::PluginNotFound
                | ErrorKind::PluginAttach
                | ErrorKind::PluginInit
                | ErrorKind::Configuration
        )
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl PartialEq for AppError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::Internal,
        };
        Self::with_source(kind, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

impl AppError {
    /// HTTP status used when this error reaches a client.
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            ErrorKind::NotFound | ErrorKind::CallNotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Hook => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = %self.kind, error = %self.message, "Request failed");
        }

        let body = ApiErrorResponse {
            error: self.kind.to_string(),
            message: self.message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::call_not_found("greet");
        assert_eq!(err.to_string(), "CALL_NOT_FOUND: Cannot call 'greet'");
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(AppError::plugin_not_found("x").is_fatal());
        assert!(AppError::plugin_attach("x", AppError::validation("bad")).is_fatal());
        assert!(AppError::plugin_init("x", AppError::internal("down")).is_fatal());
        assert!(!AppError::hook("x").is_fatal());
        assert!(!AppError::call_not_found("x").is_fatal());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::call_not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::hook("denied").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::operation("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_io_errors_map_to_host_kinds() {
        let missing: AppError = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert_eq!(missing.kind, ErrorKind::NotFound);
        let denied: AppError = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert_eq!(denied.kind, ErrorKind::Internal);
    }
}
