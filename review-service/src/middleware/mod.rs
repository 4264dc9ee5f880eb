pub mod auth;
pub mod permissions;

pub use auth::{authenticate, bearer_token, CurrentUser};
pub use permissions::{admin_or_read_only, require_admin, require_authenticated, Permission};
