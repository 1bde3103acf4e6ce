use std::sync::Arc;

use shelf_api::auth::{generate_jwt_token, AuthConfig, FixedClock, JwtClock, SystemClock};
use shelf_core::AuthorId;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-enough-length";

/// Auth config with a known secret and the system clock.
pub fn test_auth_config() -> Arc<AuthConfig> {
    auth_config_with_clock(Arc::new(SystemClock))
}

pub fn auth_config_with_clock(clock: Arc<dyn JwtClock>) -> Arc<AuthConfig> {
    Arc::new(
        AuthConfig::with_secret(TEST_JWT_SECRET, clock).expect("test secret is not empty"),
    )
}

/// `Authorization` header value for `author`.
pub fn bearer_for(config: &AuthConfig, author: AuthorId) -> String {
    let token = generate_jwt_token(config, author).expect("token");
    format!("Bearer {}", token)
}

/// Token that expired long before now.
pub fn expired_bearer_for(author: AuthorId) -> String {
    let issuing = auth_config_with_clock(Arc::new(FixedClock(1_577_836_800)));
    bearer_for(&issuing, author)
}
