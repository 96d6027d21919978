use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::store::StoreError;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Persistence failure.
    Storage(StoreError),
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// The resource is not in a state that allows the operation.
    Conflict(String),
    /// Internal server error.
    InternalError(String),
    /// Unauthorized access error.
    Unauthorized(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Storage(e) => write!(f, "Storage error: {}", e),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// HTTP status for this error; context wrappers take their source's status.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Storage(_) | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::WithContext { source, .. } => source.status(),
        }
    }

    /// Logs the error at a level matching its severity.
    pub fn log(&self) {
        match self {
            AppError::WithContext { source, context } if self.status().is_server_error() => {
                tracing::error!("Error with context: {} -> {}", context, source);
            }
            _ if self.status().is_server_error() => tracing::error!("{}", self),
            AppError::Unauthorized(msg) => tracing::warn!("Unauthorized access: {}", msg),
            _ => tracing::debug!("{}", self),
        }
    }

    /// Message safe to return to the client.
    ///
    /// Server errors never expose their cause: a context wrapper around a 5xx
    /// answers with the context itself.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Storage(_) => "Database error".to_string(),
            AppError::InternalError(_) => "Internal server error".to_string(),
            AppError::Unauthorized(_) => "Unauthorized".to_string(),
            AppError::NotFound(msg) | AppError::BadRequest(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::WithContext { source, context } => {
                if source.status().is_server_error() {
                    context.clone()
                } else {
                    source.public_message()
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Logs errors appropriately based on their severity.
    fn into_response(self) -> Response {
        let status = self.status();
        self.log();

        let body = Json(json!({
            "error": self.public_message(),
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(value) => AppError::Conflict(format!("'{}' already exists", value)),
            other => AppError::Storage(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }
}

/// Extension for StoreError to add context
impl<T> ResultExt<T> for Result<T, StoreError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: context.into(),
        })
    }
}
