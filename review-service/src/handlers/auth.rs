use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::auth::{
        AccessTokenResponse, EmailRequest, EmailResponse, RefreshRequest, TokenPairResponse,
        TokenRequest,
    },
    utils::ValidatedJson,
    AppState,
};

/// Request a confirmation code by email
///
/// Creates the account on first use. The code is only ever delivered by mail.
/// The response echoes the submitted address; lookups use its lowercased form.
#[utoipa::path(
    post,
    path = "/auth/email/",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Code issued and mailed", body = EmailResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn request_code(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.confirmation.request_code(&req.email).await?;
    Ok((StatusCode::OK, Json(EmailResponse { email: req.email })))
}

/// Exchange a confirmation code for tokens
#[utoipa::path(
    post,
    path = "/auth/token/",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Code accepted", body = TokenPairResponse),
        (status = 400, description = "Validation error or invalid confirmation code", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn exchange_code(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pair = state
        .confirmation
        .exchange_code(&req.email, &req.confirmation_code)
        .await?;
    Ok((StatusCode::OK, Json(TokenPairResponse::from(pair))))
}

/// Trade a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/auth/token/refresh/",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Access token issued", body = AccessTokenResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let claims = state
        .jwt
        .validate_refresh_token(&req.refresh)
        .map_err(AppError::Unauthorized)?;
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("User not found")))?;

    let access = state.jwt.generate_access_token(&user)?;
    Ok((StatusCode::OK, Json(AccessTokenResponse { access })))
}
