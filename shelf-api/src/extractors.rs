//! Request extractors.
//!
//! - [`ValidatedJson`]: parse the body, then run the payload's field rules
//! - [`Credentials`]: capture the raw `Authorization` header without judging it
//! - [`RequestId`]: the `x-request-id` assigned by the request-id layer
//! - [`PathId`]: a typed entity id from the path

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderName},
    Json,
};
use serde::de::DeserializeOwned;
use shelf_core::{EntityIdType, StorageError};
use std::convert::Infallible;
use std::fmt;

use crate::error::ApiError;
use crate::validation::Validate;

/// Header carrying the per-request correlation id.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

// ============================================================================
// VALIDATED JSON
// ============================================================================

/// JSON body that has passed [`Validate`].
///
/// Malformed JSON or a wrong content type is rejected as a validation error
/// before any field rule runs.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::invalid_input(rejection.body_text()))?;

        value.validate()?;
        Ok(Self(value))
    }
}

// ============================================================================
// CREDENTIALS
// ============================================================================

/// Raw `Authorization` header value, if any.
///
/// Extraction never fails; the handler decides when to resolve it so that
/// payload validation can run first.
#[derive(Clone, Default)]
pub struct Credentials(pub Option<String>);

impl Credentials {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.0.as_ref().map(|_| "[REDACTED]");
        f.debug_tuple("Credentials").field(&shown).finish()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Self(value))
    }
}

// ============================================================================
// REQUEST ID
// ============================================================================

/// Correlation id of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Map a storage failure of this request to its API error.
    pub fn storage_error(&self, err: StorageError) -> ApiError {
        ApiError::from_storage(err, &self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        Ok(Self(id))
    }
}

// ============================================================================
// PATH ID
// ============================================================================

/// Typed entity id from a single path parameter.
///
/// A value that is not a UUID is rejected with an InvalidArgument error.
#[derive(Debug, Clone, Copy)]
pub struct PathId<T: EntityIdType>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: EntityIdType,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_argument("id", e.body_text()))?;

        raw.parse::<T>().map(PathId).map_err(|_| {
            ApiError::invalid_argument(
                "id",
                format!("'{}' is not a valid {} id", raw, T::ENTITY_NAME),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiResult, ErrorCode};
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    impl Validate for Named {
        fn validate(&self) -> ApiResult<()> {
            let mut v = crate::validation::Validator::new();
            v.required("name", &self.name);
            v.finish()
        }
    }

    fn json_request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn test_validated_json_accepts_valid_body() -> ApiResult<()> {
        let ValidatedJson(named) =
            ValidatedJson::<Named>::from_request(json_request(r#"{"name":"x"}"#), &()).await?;
        assert_eq!(named.name, "x");
        Ok(())
    }

    #[tokio::test]
    async fn test_validated_json_rejects_malformed_body() {
        let err = ValidatedJson::<Named>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_validated_json_runs_rules() {
        let err = ValidatedJson::<Named>::from_request(json_request(r#"{"name":" "}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_credentials_and_request_id() {
        let request = HttpRequest::builder()
            .uri("/")
            .header("authorization", "Bearer abc")
            .header("x-request-id", "req-1")
            .body(())
            .expect("request");
        let (mut parts, _) = request.into_parts();

        let creds = Credentials::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(creds.as_deref(), Some("Bearer abc"));
        assert!(!format!("{:?}", creds).contains("abc"));

        let id = RequestId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id.as_str(), "req-1");
    }
}
