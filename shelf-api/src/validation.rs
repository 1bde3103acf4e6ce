//! Validation Traits
//!
//! Field-level checks shared by request types, plus a [`Validator`] that
//! collects every violation of a payload instead of stopping at the first.

use crate::error::{ApiError, ApiResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A string field that must hold some text.
pub trait ValidateNonEmpty {
    /// Fails with `ApiError::missing_field` when the value is empty or
    /// whitespace-only.
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        if self.trim().is_empty() {
            return Err(ApiError::missing_field(field_name));
        }
        Ok(())
    }
}

/// An amount, such as a price in minor units, that cannot go below zero.
pub trait ValidateNonNegative {
    fn validate_non_negative(&self, field_name: &str) -> ApiResult<()>;
}

impl ValidateNonNegative for i64 {
    fn validate_non_negative(&self, field_name: &str) -> ApiResult<()> {
        if *self < 0 {
            return Err(ApiError::negative_amount(field_name));
        }
        Ok(())
    }
}

/// Update payloads whose fields are all optional.
///
/// An update with nothing set is accepted but skips persistence.
pub trait HasUpdates {
    fn has_any_updates(&self) -> bool;
}

/// A request type that knows its own field rules.
pub trait Validate {
    /// Check every rule, reporting all violations at once.
    fn validate(&self) -> ApiResult<()>;
}

// ============================================================================
// VIOLATION COLLECTOR
// ============================================================================

static EMAIL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Violation {
    /// Field the rule was applied to
    pub field: String,
    /// Rule name (`required`, `email`, `one_of`, `non_negative`, or custom)
    pub rule: String,
    /// Human-readable explanation
    pub message: String,
}

/// Collects violations across many field checks.
///
/// ```ignore
/// let mut v = Validator::new();
/// v.required("title", &req.title).non_negative("price", req.price);
/// v.finish()?;
/// ```
#[derive(Debug, Default)]
pub struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, field: &str, rule: &str, result: ApiResult<()>) -> &mut Self {
        if let Err(e) = result {
            self.violations.push(Violation {
                field: field.to_string(),
                rule: rule.to_string(),
                message: e.message,
            });
        }
        self
    }

    /// Value must contain a non-whitespace character.
    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        self.record(field, "required", value.validate_non_empty(field))
    }

    /// Value must look like an email address.
    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let valid = EMAIL_RE.as_ref().is_some_and(|re| re.is_match(value));
        self.check(
            field,
            "email",
            valid,
            format!("Field '{}' must be a valid email address", field),
        )
    }

    /// Value must be one of `allowed`.
    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        let valid = allowed.contains(&value);
        self.check(
            field,
            "one_of",
            valid,
            format!("Field '{}' must be one of: {}", field, allowed.join(", ")),
        )
    }

    /// Value must be zero or more.
    pub fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
        self.record(field, "non_negative", value.validate_non_negative(field))
    }

    /// Custom named predicate.
    pub fn check(
        &mut self,
        field: &str,
        rule: &str,
        passed: bool,
        message: impl Into<String>,
    ) -> &mut Self {
        if !passed {
            self.violations.push(Violation {
                field: field.to_string(),
                rule: rule.to_string(),
                message: message.into(),
            });
        }
        self
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// `Ok` if nothing failed, otherwise one ValidationFailed error listing
    /// every violation in its message and details.
    pub fn finish(&mut self) -> ApiResult<()> {
        if self.violations.is_empty() {
            return Ok(());
        }

        let violations = std::mem::take(&mut self.violations);
        let message = violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let details = serde_json::to_value(&violations)?;

        Err(ApiError::validation_failed(message).with_details(details))
    }
}
