use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        pagination::{Page, PageRequest, SearchParams},
        user::{CreateUserRequest, UpdateUserRequest, UserResponse},
    },
    middleware::CurrentUser,
    models::User,
    utils::ValidatedJson,
    AppState,
};

async fn find_user(state: &AppState, username: &str) -> Result<User, AppError> {
    state
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Not found.")))
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/users/me/",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

/// Update the current user's profile
///
/// `role` is ignored here.
#[utoipa::path(
    patch,
    path = "/users/me/",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    req.apply(&mut user, false)?;
    let user = state.users.update_user(&user).await?;
    Ok(Json(user.into()))
}

/// List users
#[utoipa::path(
    get,
    path = "/users/",
    params(SearchParams),
    responses(
        (status = 200, description = "Page of users", body = UserPage),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    uri: Uri,
) -> Result<Json<Page<UserResponse>>, AppError> {
    let page = PageRequest::new(params.page, state.config.pagination.page_size)?;
    let listing = state
        .users
        .list_users(params.search.as_deref(), page.window())
        .await?;
    Ok(Json(page.page(listing, &uri)?))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/users/",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users.create_user(req.into()).await?;
    tracing::info!(user_id = user.id, "User created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Get a user by username
#[utoipa::path(
    get,
    path = "/users/{username}/",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(find_user(&state, &username).await?.into()))
}

/// Partially update a user
#[utoipa::path(
    patch,
    path = "/users/{username}/",
    params(("username" = String, Path, description = "Username")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let mut user = find_user(&state, &username).await?;
    req.apply(&mut user, true)?;
    let user = state.users.update_user(&user).await?;
    tracing::info!(user_id = user.id, role = user.role.as_str(), "User updated");
    Ok(Json(user.into()))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{username}/",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.users.delete_user(&username).await? {
        tracing::info!(username = %username, "User deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("Not found.")))
    }
}
