use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        catalog::{GenreRequest, GenreResponse},
        pagination::{Page, PageRequest, SearchParams},
    },
    utils::ValidatedJson,
    AppState,
};

/// List genres
#[utoipa::path(
    get,
    path = "/genres/",
    params(SearchParams),
    responses(
        (status = 200, description = "Page of genres", body = GenrePage),
        (status = 404, description = "Invalid page", body = ErrorResponse)
    ),
    tag = "Genres"
)]
pub async fn list_genres(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    uri: Uri,
) -> Result<Json<Page<GenreResponse>>, AppError> {
    let page = PageRequest::new(params.page, state.config.pagination.page_size)?;
    let listing = state
        .catalog
        .list_genres(params.search.as_deref(), page.window())
        .await?;
    Ok(Json(page.page(listing, &uri)?))
}

/// Create a genre
#[utoipa::path(
    post,
    path = "/genres/",
    request_body = GenreRequest,
    responses(
        (status = 201, description = "Genre created", body = GenreResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    tag = "Genres",
    security(("bearer_auth" = []))
)]
pub async fn create_genre(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<GenreRequest>,
) -> Result<impl IntoResponse, AppError> {
    let genre = state.catalog.create_genre(req.into()).await?;
    tracing::info!(slug = %genre.slug, "Genre created");
    Ok((StatusCode::CREATED, Json(GenreResponse::from(genre))))
}

/// Delete a genre
#[utoipa::path(
    delete,
    path = "/genres/{slug}/",
    params(("slug" = String, Path, description = "Genre slug")),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Genres",
    security(("bearer_auth" = []))
)]
pub async fn delete_genre(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.catalog.delete_genre(&slug).await? {
        tracing::info!(slug = %slug, "Genre deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("Not found.")))
    }
}
