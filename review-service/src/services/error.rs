use service_core::error::AppError;
use std::borrow::Cow;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    /// Rejected input, reported against a single field the way form
    /// validation errors are.
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    /// Covers malformed codes, codes for another identity and unknown
    /// emails alike; callers never learn which.
    #[error("Invalid confirmation code")]
    InvalidConfirmationCode,

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl ServiceError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Invalid {
            field,
            message: message.into(),
        }
    }

    /// Maps a unique constraint name to the field and message clients see.
    pub fn duplicate(constraint: &str) -> Self {
        let (field, message) = match constraint {
            "users_username_key" => ("username", "A user with that username already exists."),
            "users_email_key" => ("email", "A user with that email already exists."),
            "categories_slug_key" => ("slug", "A category with this slug already exists."),
            "genres_slug_key" => ("slug", "A genre with this slug already exists."),
            _ => ("non_field_errors", "A record with these values already exists."),
        };
        ServiceError::invalid(field, message)
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return ServiceError::duplicate(db_err.constraint().unwrap_or_default());
            }
        }
        ServiceError::Database(err)
    }
}

pub fn field_error(field: &'static str, message: impl Into<String>) -> ValidationErrors {
    let mut error = ValidationError::new("invalid");
    error.message = Some(Cow::Owned(message.into()));
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::Invalid { field, message } => {
                AppError::ValidationError(field_error(field, message))
            }
            ServiceError::InvalidConfirmationCode => {
                AppError::BadRequest(anyhow::anyhow!("Invalid confirmation code"))
            }
            ServiceError::NotFound(what) => AppError::NotFound(anyhow::anyhow!("{} not found", what)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::http::StatusCode;

    #[test]
    fn duplicate_constraints_map_to_field_errors() {
        match ServiceError::duplicate("users_email_key") {
            ServiceError::Invalid { field, .. } => assert_eq!(field, "email"),
            other => panic!("unexpected {:?}", other),
        }
        match ServiceError::duplicate("something_else") {
            ServiceError::Invalid { field, .. } => assert_eq!(field, "non_field_errors"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn confirmation_failures_are_bad_requests() {
        let app: AppError = ServiceError::InvalidConfirmationCode.into();
        assert_eq!(app.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_input_keeps_field_name() {
        let app: AppError = ServiceError::invalid("year", "Is your title from the future?").into();
        match app {
            AppError::ValidationError(errors) => {
                assert!(errors.field_errors().contains_key("year"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
