pub mod auth;
pub mod catalog;
pub mod pagination;
pub mod user;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::ValidationError;

use crate::services::ServiceError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Validation error")]
    pub error: String,
    /// Field name to messages for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Letters, digits, `-` and `_`.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(invalid(
            "invalid_slug",
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
        ))
    }
}

/// Word characters plus `.@+-`. `me` is reserved for the profile route.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username == "me" {
        return Err(invalid("reserved_username", "Username 'me' is not allowed."));
    }
    if !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
    {
        Ok(())
    } else {
        Err(invalid(
            "invalid_username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ))
    }
}

/// Release years may not lie in the future.
pub fn check_year(year: Option<i32>) -> Result<(), ServiceError> {
    match year {
        Some(year) if year > Utc::now().year() => {
            Err(ServiceError::invalid("year", "Is your title from the future?"))
        }
        _ => Ok(()),
    }
}
