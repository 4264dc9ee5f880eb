//! User accounts and the identity payload confirmation codes are bound to.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Width of the `users.username` column.
pub const USERNAME_MAX_LEN: usize = 150;

/// Usernames tried when creating an account from an email before giving up.
pub const USERNAME_ATTEMPTS: u32 = 5;

/// Authorization role. Stored as the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The identity fields a confirmation code is bound to. Any change to
    /// them invalidates codes issued earlier.
    pub fn confirmation_payload(&self) -> ConfirmationPayload {
        ConfirmationPayload {
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Recomputed on every request and compared, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPayload {
    pub username: String,
    pub email: String,
}

/// A user row before the database assigns its id.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl NewUser {
    /// The account created on a first confirmation-code request, using the
    /// `attempt`-th username candidate for `email`.
    pub fn from_email(email: &str, attempt: u32) -> Self {
        Self {
            username: username_candidate(email, attempt),
            email: email.to_string(),
            ..Default::default()
        }
    }
}

/// Username for an account created from `email`. The first candidate is the
/// email cut to the column width; later ones end in a random suffix for when
/// another account already holds the plain form.
pub fn username_candidate(email: &str, attempt: u32) -> String {
    if attempt == 0 {
        return email.chars().take(USERNAME_MAX_LEN).collect();
    }

    let suffix = Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];
    let head: String = email.chars().take(USERNAME_MAX_LEN - suffix.len() - 1).collect();
    format!("{}-{}", head, suffix)
}
