//! Role checks run after `authenticate`, attached per route group.

use axum::{extract::Request, http::Method, middleware::Next, response::Response};
use service_core::error::AppError;

use super::auth::{CurrentUser, NOT_AUTHENTICATED};
use crate::models::User;

pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    IsAuthenticated,
    IsAdmin,
    /// Safe methods for everyone, the rest for admins.
    IsAdminOrReadOnly,
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

impl Permission {
    /// 401 when a user is needed and absent, 403 when present but not allowed.
    pub fn check(self, method: &Method, user: Option<&User>) -> Result<(), AppError> {
        if self == Permission::IsAdminOrReadOnly && is_safe(method) {
            return Ok(());
        }

        let user = user.ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!(NOT_AUTHENTICATED)))?;
        match self {
            Permission::IsAuthenticated => Ok(()),
            Permission::IsAdmin | Permission::IsAdminOrReadOnly if user.is_admin() => Ok(()),
            _ => {
                tracing::warn!(user_id = user.id, method = %method, "Permission denied");
                Err(AppError::Forbidden(anyhow::anyhow!(PERMISSION_DENIED)))
            }
        }
    }
}

async fn enforce(permission: Permission, req: Request, next: Next) -> Result<Response, AppError> {
    permission.check(
        req.method(),
        req.extensions().get::<CurrentUser>().map(|current| &current.0),
    )?;
    Ok(next.run(req).await)
}

pub async fn require_authenticated(req: Request, next: Next) -> Result<Response, AppError> {
    enforce(Permission::IsAuthenticated, req, next).await
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    enforce(Permission::IsAdmin, req, next).await
}

pub async fn admin_or_read_only(req: Request, next: Next) -> Result<Response, AppError> {
    enforce(Permission::IsAdminOrReadOnly, req, next).await
}
