//! Uniform response body.
//!
//! Every endpoint answers with `{code, is_success, data}`, success or failure.
//! Failure bodies carry the message in `data` and optional structured
//! `details` (e.g. the list of field violations).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Envelope code for every successful book operation.
pub const SUCCESS_CODE: &str = "s-book-001";

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Envelope<T> {
    /// Stable machine-readable outcome code (`s-book-001`, `e-auth-001`, ...)
    pub code: String,

    /// Whether the operation succeeded
    pub is_success: bool,

    /// Payload on success, human-readable message on failure
    pub data: T,

    /// Structured failure details, when there are any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl<T> Envelope<T> {
    /// Successful envelope around `data`.
    pub fn success(data: T) -> Self {
        Self {
            code: SUCCESS_CODE.to_string(),
            is_success: true,
            data,
            details: None,
        }
    }
}

impl Envelope<String> {
    /// Successful envelope carrying only a confirmation message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::success(message.into())
    }

    /// Failure envelope.
    pub fn failure(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            code: code.into(),
            is_success: false,
            data: message.into(),
            details,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = if self.is_success {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_shape() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(Envelope::success(vec![1, 2]))?;
        assert_eq!(json["code"], "s-book-001");
        assert_eq!(json["is_success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert!(json.get("details").is_none());
        Ok(())
    }

    #[test]
    fn test_failure_shape() -> Result<(), serde_json::Error> {
        let envelope = Envelope::failure(
            "e-validation-001",
            "title is required",
            Some(serde_json::json!([{"field": "title"}])),
        );
        let json = serde_json::to_value(&envelope)?;
        assert_eq!(json["is_success"], false);
        assert_eq!(json["data"], "title is required");
        assert_eq!(json["details"][0]["field"], "title");
        Ok(())
    }
}
