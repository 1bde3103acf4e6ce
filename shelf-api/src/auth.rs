//! Caller identity for book writes.
//!
//! Creating, updating and deleting a book require an
//! `Authorization: Bearer <jwt>` header whose `sub` is the author's UUID.
//! That author becomes the owner of a created book and must be the owner of
//! a book that is changed. There is no sign-in endpoint; tokens come from
//! [`generate_jwt_token`] in operator tooling and tests.

use crate::error::{ApiError, ApiResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use shelf_core::{AuthorId, ConfigError};
use std::collections::HashSet;
use std::sync::Arc;

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCKS
// ============================================================================

/// Source of "now" for token expiry checks.
pub trait JwtClock: Send + Sync {
    /// Unix epoch seconds. Negative when the host clock is before 1970.
    fn now_epoch_secs(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Pinned time, for issuing tokens that are already expired or for
/// checking them at a chosen instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// JWT SECRET
// ============================================================================

/// HMAC key for author tokens. `Debug` prints only its length.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    pub fn new(secret: String) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "jwt_secret".to_string(),
            });
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into())),
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// How author tokens are signed and checked.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: JwtSecret,
    /// HS256
    pub jwt_algorithm: Algorithm,
    /// Lifetime of issued tokens (3600)
    pub jwt_expiration_secs: i64,
    /// Seconds a token is still honoured past `exp` (60)
    pub jwt_clock_skew_secs: i64,
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: build_jwt_secret(INSECURE_DEFAULT_SECRET.to_string()),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Reads `SHELF_JWT_SECRET`, `SHELF_JWT_EXPIRATION_SECS` and
    /// `SHELF_JWT_CLOCK_SKEW_SECS`. Unparseable numbers keep their defaults.
    pub fn from_env() -> Self {
        let secret_str = std::env::var("SHELF_JWT_SECRET")
            .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: std::env::var("SHELF_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            jwt_clock_skew_secs: std::env::var("SHELF_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_secret(secret: impl Into<String>, clock: Arc<dyn JwtClock>) -> Result<Self, ConfigError> {
        Ok(Self {
            jwt_secret: JwtSecret::new(secret.into())?,
            clock,
            ..Default::default()
        })
    }

    /// In production (`SHELF_ENVIRONMENT=production|prod`) the default or a
    /// secret under 32 characters stops startup. Elsewhere it is a warning.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let environment = std::env::var("SHELF_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase();

        let is_production = environment == "production" || environment == "prod";

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::internal_error(format!(
                    "Cannot start server in production with insecure JWT secret. \
                     Set SHELF_JWT_SECRET to a secure value. \
                     SHELF_ENVIRONMENT={}",
                    environment
                )));
            }
            tracing::warn!(
                "Using insecure default JWT secret. Set SHELF_JWT_SECRET \
                 (minimum 32 characters) before deploying."
            );
        }

        if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::internal_error(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least 32 characters long.",
                    self.jwt_secret.len()
                )));
            } else if !self.jwt_secret.is_insecure_default() {
                tracing::warn!(
                    secret_len = self.jwt_secret.len(),
                    "JWT secret is shorter than 32 characters"
                );
            }
        }

        Ok(())
    }
}

// ============================================================================
// TOKENS
// ============================================================================

/// Claims of an author token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Author id as a UUID string
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(subject: String, expiration_secs: i64, clock: &dyn JwtClock) -> Self {
        let now = clock.now_epoch_secs();
        Self {
            sub: subject,
            iat: now,
            exp: now + expiration_secs,
        }
    }
}

/// The author a request acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub author_id: AuthorId,
}

impl AuthContext {
    pub fn new(author_id: AuthorId) -> Self {
        Self { author_id }
    }
}

/// Check signature and expiry of `token`.
///
/// `jsonwebtoken` only verifies the signature and that `exp` is present;
/// expiry is judged against the configured clock with
/// `jwt_clock_skew_secs` of leeway.
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    let claims = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token(format!("Token is invalid: {}", e)),
        })?
        .claims;

    let now = config.clock.now_epoch_secs();
    if now < 0 {
        // Expiry cannot be judged, so the caller stays anonymous.
        tracing::error!(now, "Host clock is before 1970; refusing author tokens");
        return Err(ApiError::unauthorized(
            "Token expiry cannot be verified right now",
        ));
    }

    if claims.exp < now - config.jwt_clock_skew_secs {
        return Err(ApiError::token_expired());
    }

    Ok(claims)
}

/// Sign a token whose `sub` is `author_id`.
pub fn generate_jwt_token(config: &AuthConfig, author_id: AuthorId) -> ApiResult<String> {
    let claims = Claims::new(author_id.to_string(), config.jwt_expiration_secs, &*config.clock);

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Resolve the author behind a raw `Authorization` header value.
pub fn authenticate(config: &AuthConfig, auth_header: Option<&str>) -> ApiResult<AuthContext> {
    let auth_value = auth_header.ok_or_else(|| {
        ApiError::unauthorized("Authentication required: provide an Authorization header")
    })?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::invalid_token("Authorization header must use Bearer scheme"))?;

    let claims = validate_jwt_token(config, token)?;

    let author_id = claims
        .sub
        .parse::<AuthorId>()
        .map_err(|_| ApiError::invalid_token("Token subject is not a valid author id"))?;

    Ok(AuthContext::new(author_id))
}

// ============================================================================
// IDENTITY RESOLVER
// ============================================================================

/// Turns the credential of a write request into the acting author.
///
/// Fails with an Unauthenticated-kind [`ApiError`] when the credential is
/// absent or cannot be verified.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, credential: Option<&str>) -> ApiResult<AuthContext>;
}

/// Resolver for HS256 author tokens.
#[derive(Debug, Clone)]
pub struct JwtIdentityResolver {
    config: Arc<AuthConfig>,
}

impl JwtIdentityResolver {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        Self { config }
    }
}

impl IdentityResolver for JwtIdentityResolver {
    fn resolve(&self, credential: Option<&str>) -> ApiResult<AuthContext> {
        authenticate(&self.config, credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::http::StatusCode;
    use shelf_core::EntityIdType;
    use std::sync::Mutex;

    /// 2024-01-01 00:00:00 UTC
    const ISSUED_AT: i64 = 1_704_067_200;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct EnvVarGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var(key).ok();
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.previous.as_deref() {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn test_config() -> AuthConfig {
        AuthConfig::with_secret("test_secret", Arc::new(FixedClock(ISSUED_AT)))
            .expect("test secret should be valid")
    }

    #[test]
    fn test_jwt_generation_and_validation() -> ApiResult<()> {
        let config = test_config();
        let author = AuthorId::now_v7();

        let token = generate_jwt_token(&config, author)?;
        let claims = validate_jwt_token(&config, &token)?;

        assert_eq!(claims.sub, author.to_string());
        assert_eq!(claims.iat, ISSUED_AT);
        assert_eq!(claims.exp, ISSUED_AT + config.jwt_expiration_secs);
        Ok(())
    }

    #[test]
    fn test_expired_token() -> ApiResult<()> {
        let mut config = test_config();
        config.jwt_expiration_secs = -1;
        let token = generate_jwt_token(&config, AuthorId::now_v7())?;

        // 2030-01-01
        config.clock = Arc::new(FixedClock(1_893_456_000));
        let err = validate_jwt_token(&config, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
        Ok(())
    }

    #[test]
    fn test_wrong_secret_is_rejected() -> ApiResult<()> {
        let config = test_config();
        let token = generate_jwt_token(&config, AuthorId::now_v7())?;

        let other = AuthConfig::with_secret("another_secret", Arc::new(FixedClock(ISSUED_AT)))
            .expect("test secret should be valid");
        let err = validate_jwt_token(&other, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
        Ok(())
    }

    #[test]
    fn test_authenticate_with_bearer() -> ApiResult<()> {
        let config = test_config();
        let author = AuthorId::now_v7();
        let token = generate_jwt_token(&config, author)?;

        let ctx = authenticate(&config, Some(&format!("Bearer {}", token)))?;
        assert_eq!(ctx.author_id, author);
        Ok(())
    }

    #[test]
    fn test_authenticate_missing_header() {
        let err = authenticate(&test_config(), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn test_authenticate_wrong_scheme() {
        let err = authenticate(&test_config(), Some("Basic dXNlcjpwYXNz")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
        let err = authenticate(&test_config(), Some("Bearer ")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[test]
    fn test_authenticate_rejects_non_uuid_subject() -> Result<(), Box<dyn std::error::Error>> {
        let config = test_config();
        let claims = Claims::new("u1".to_string(), 3600, &FixedClock(ISSUED_AT));
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.expose().as_bytes()),
        )?;

        let err = authenticate(&config, Some(&format!("Bearer {}", token))).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
        Ok(())
    }

    #[test]
    fn test_jwt_resolver() -> ApiResult<()> {
        let config = Arc::new(test_config());
        let resolver = JwtIdentityResolver::new(config.clone());
        let author = AuthorId::now_v7();
        let token = generate_jwt_token(&config, author)?;

        assert_eq!(resolver.resolve(Some(&format!("Bearer {token}")))?.author_id, author);
        assert!(resolver.resolve(None).is_err());
        Ok(())
    }

    #[test]
    fn test_clock_skew_tolerance() -> ApiResult<()> {
        let mut config = test_config();
        config.jwt_clock_skew_secs = 60;
        config.jwt_expiration_secs = 100;
        let token = generate_jwt_token(&config, AuthorId::now_v7())?;

        config.clock = Arc::new(FixedClock(ISSUED_AT + 130));
        assert!(validate_jwt_token(&config, &token).is_ok());

        config.clock = Arc::new(FixedClock(ISSUED_AT + 200));
        let err = validate_jwt_token(&config, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
        Ok(())
    }

    #[test]
    fn test_pre_epoch_clock_leaves_caller_unauthenticated() -> ApiResult<()> {
        let mut config = test_config();
        let token = generate_jwt_token(&config, AuthorId::now_v7())?;

        config.clock = Arc::new(FixedClock(-1000));
        let err = authenticate(&config, Some(&format!("Bearer {}", token))).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code.envelope_code(), "e-auth-001");
        Ok(())
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = JwtSecret::new("super-secret-value".to_string()).expect("valid");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_production_validation_rejects_insecure_default() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _env_guard = EnvVarGuard::set("SHELF_ENVIRONMENT", Some("production"));
        assert!(AuthConfig::default().validate_for_production().is_err());
    }

    #[test]
    fn test_production_validation_rejects_short_secret() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _env_guard = EnvVarGuard::set("SHELF_ENVIRONMENT", Some("production"));
        let config = AuthConfig::with_secret("short", Arc::new(SystemClock)).expect("valid");
        assert!(config.validate_for_production().is_err());
    }

    #[test]
    fn test_production_validation_allows_secure_secret() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _env_guard = EnvVarGuard::set("SHELF_ENVIRONMENT", Some("production"));
        let config = AuthConfig::with_secret(
            "this-is-a-very-secure-secret-that-is-at-least-32-characters-long",
            Arc::new(SystemClock),
        )
        .expect("valid");
        assert!(config.validate_for_production().is_ok());
    }

    #[test]
    fn test_production_validation_allows_development() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _env_guard = EnvVarGuard::set("SHELF_ENVIRONMENT", None);
        assert!(AuthConfig::default().validate_for_production().is_ok());
    }

    #[test]
    fn test_from_env_reads_overrides() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _secret = EnvVarGuard::set("SHELF_JWT_SECRET", Some("from-env-secret"));
        let _exp = EnvVarGuard::set("SHELF_JWT_EXPIRATION_SECS", Some("120"));
        let _skew = EnvVarGuard::set("SHELF_JWT_CLOCK_SKEW_SECS", Some("not-a-number"));

        let config = AuthConfig::from_env();
        assert_eq!(config.jwt_secret.expose(), "from-env-secret");
        assert_eq!(config.jwt_expiration_secs, 120);
        assert_eq!(config.jwt_clock_skew_secs, 60);
    }
}
