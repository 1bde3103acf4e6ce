//! HTTP failures of the book endpoints.
//!
//! A handler fails with an [`ApiError`]; the response is always an
//! [`Envelope`] with `is_success: false`, the `e-*` code of its
//! [`ErrorCode`], and the message in `data`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use shelf_core::{ErrorKind, StorageError};
use std::fmt;

use crate::envelope::Envelope;

// ============================================================================
// ERROR CODES
// ============================================================================

/// Failure categories a book request can end in.
///
/// Several codes may share one envelope code: clients only see `e-auth-001`
/// for any identity problem, while logs keep the finer distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No `Authorization` header, or the resolver has no identity to give
    Unauthorized,
    /// Bearer token that does not verify or names no author
    InvalidToken,
    /// Bearer token past `exp` plus clock skew
    TokenExpired,
    /// Caller is known but does not own the book
    Forbidden,

    /// One or more field rules failed on the payload
    ValidationFailed,
    /// Body is not JSON of the expected shape
    InvalidInput,
    /// `page`, `limit` or a path id could not be interpreted
    InvalidArgument,

    /// No book with the requested id
    EntityNotFound,
    /// The repository refused or failed the operation
    PersistenceFailed,

    InternalError,
    /// Repository or pool could not be reached
    ServiceUnavailable,
    /// Request ran past `SHELF_REQUEST_TIMEOUT_SECS`
    Timeout,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            // Persistence failures stay on 400 to match the published contract.
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::InvalidArgument
            | ErrorCode::PersistenceFailed => StatusCode::BAD_REQUEST,

            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Envelope code reported to clients.
    pub fn envelope_code(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                "e-auth-001"
            }
            ErrorCode::Forbidden => "e-book-002",
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput => "e-validation-001",
            ErrorCode::InvalidArgument => "e-request-001",
            ErrorCode::EntityNotFound => "e-book-404",
            ErrorCode::PersistenceFailed => "e-book-001",
            ErrorCode::InternalError => "e-internal-001",
            ErrorCode::ServiceUnavailable => "e-internal-002",
            ErrorCode::Timeout => "e-internal-003",
        }
    }

    /// Coarse classification of this code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                ErrorKind::Unauthenticated
            }
            ErrorCode::Forbidden => ErrorKind::Forbidden,
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput => ErrorKind::Validation,
            ErrorCode::InvalidArgument => ErrorKind::InvalidArgument,
            ErrorCode::EntityNotFound => ErrorKind::NotFound,
            ErrorCode::PersistenceFailed => ErrorKind::Persistence,
            ErrorCode::InternalError | ErrorCode::ServiceUnavailable | ErrorCode::Timeout => {
                ErrorKind::Internal
            }
        }
    }

    /// Message used when the failure site has nothing more specific to say.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::Forbidden => "user is not owner of this book",
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::InvalidArgument => "Invalid request parameter",
            ErrorCode::EntityNotFound => "Book not found",
            ErrorCode::PersistenceFailed => "Storage operation failed",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::Timeout => "Request timed out",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR
// ============================================================================

/// A failed book request: what went wrong and what the client is told.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    pub code: ErrorCode,

    /// Sent to the client as the envelope's `data`
    pub message: String,

    /// Field violations, reported under `details`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// A required text field was empty.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::ValidationFailed,
            format!("Field '{}' is required", field),
        )
    }

    /// An amount such as `price` was below zero.
    pub fn negative_amount(field: &str) -> Self {
        Self::new(
            ErrorCode::ValidationFailed,
            format!("Field '{}' must not be negative", field),
        )
    }

    pub fn invalid_argument(field: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidArgument,
            format!("Invalid value for '{}': {}", field, reason),
        )
    }

    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} not found", entity_type, id),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn timeout() -> Self {
        Self::from_code(ErrorCode::Timeout)
    }

    /// Map a repository failure of request `request_id`.
    ///
    /// Backend text of persistence failures goes to the log only; the client
    /// gets the request id to quote.
    pub fn from_storage(err: StorageError, request_id: &str) -> Self {
        match err {
            StorageError::NotFound { entity, id } => Self::entity_not_found(entity, id),
            StorageError::InvalidArgument { field, reason } => {
                Self::invalid_argument(&field, reason)
            }
            StorageError::Persistence { operation, reason } => {
                tracing::error!(
                    request_id = %request_id,
                    operation,
                    reason = %reason,
                    "Storage operation failed"
                );
                Self::new(
                    ErrorCode::PersistenceFailed,
                    format!(
                        "Cannot complete {} (request id: {})",
                        operation, request_id
                    ),
                )
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Envelope::failure(self.code.envelope_code(), self.message, self.details);
        (status, Json(body)).into_response()
    }
}

// Violation details that fail to serialize are a server fault, not a bad request.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal_error(format!("Failed to encode error details: {}", err))
    }
}

// Startup configuration problems abort `main`.
impl From<shelf_core::ConfigError> for ApiError {
    fn from(err: shelf_core::ConfigError) -> Self {
        ApiError::internal_error(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
