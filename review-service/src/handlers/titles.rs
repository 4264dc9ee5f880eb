use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        catalog::{CreateTitleRequest, TitleResponse, UpdateTitleRequest},
        check_year,
        pagination::{Page, PageRequest, TitleParams},
    },
    models::TitleFilter,
    utils::ValidatedJson,
    AppState,
};

fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Not found."))
}

/// List titles
#[utoipa::path(
    get,
    path = "/titles/",
    params(TitleParams),
    responses(
        (status = 200, description = "Page of titles ordered by name", body = TitlePage),
        (status = 404, description = "Invalid page", body = ErrorResponse)
    ),
    tag = "Titles"
)]
pub async fn list_titles(
    State(state): State<AppState>,
    Query(params): Query<TitleParams>,
    uri: Uri,
) -> Result<Json<Page<TitleResponse>>, AppError> {
    let page = PageRequest::new(params.page, state.config.pagination.page_size)?;
    let filter = TitleFilter {
        genre: params.genre,
        category: params.category,
        name: params.name,
        year: params.year,
    };
    let listing = state.catalog.list_titles(&filter, page.window()).await?;
    Ok(Json(page.page(listing, &uri)?))
}

/// Get a title
#[utoipa::path(
    get,
    path = "/titles/{id}/",
    params(("id" = i64, Path, description = "Title id")),
    responses(
        (status = 200, description = "Title", body = TitleResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Titles"
)]
pub async fn get_title(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TitleResponse>, AppError> {
    let title = state.catalog.find_title(id).await?.ok_or_else(not_found)?;
    Ok(Json(title.into()))
}

/// Create a title
#[utoipa::path(
    post,
    path = "/titles/",
    request_body = CreateTitleRequest,
    responses(
        (status = 201, description = "Title created", body = TitleResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    tag = "Titles",
    security(("bearer_auth" = []))
)]
pub async fn create_title(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_year(req.year)?;
    let title = state.catalog.create_title(req.into()).await?;
    tracing::info!(title_id = title.id, "Title created");
    Ok((StatusCode::CREATED, Json(TitleResponse::from(title))))
}

/// Partially update a title
#[utoipa::path(
    patch,
    path = "/titles/{id}/",
    params(("id" = i64, Path, description = "Title id")),
    request_body = UpdateTitleRequest,
    responses(
        (status = 200, description = "Title updated", body = TitleResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Titles",
    security(("bearer_auth" = []))
)]
pub async fn update_title(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateTitleRequest>,
) -> Result<Json<TitleResponse>, AppError> {
    check_year(req.year)?;
    let title = state
        .catalog
        .update_title(id, req.into())
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(title.into()))
}

/// Delete a title
#[utoipa::path(
    delete,
    path = "/titles/{id}/",
    params(("id" = i64, Path, description = "Title id")),
    responses(
        (status = 204, description = "Title deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Titles",
    security(("bearer_auth" = []))
)]
pub async fn delete_title(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if state.catalog.delete_title(id).await? {
        tracing::info!(title_id = id, "Title deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}
