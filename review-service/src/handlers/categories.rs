use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        catalog::{CategoryRequest, CategoryResponse},
        pagination::{Page, PageRequest, SearchParams},
    },
    utils::ValidatedJson,
    AppState,
};

/// List categories
#[utoipa::path(
    get,
    path = "/categories/",
    params(SearchParams),
    responses(
        (status = 200, description = "Page of categories", body = CategoryPage),
        (status = 404, description = "Invalid page", body = ErrorResponse)
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    uri: Uri,
) -> Result<Json<Page<CategoryResponse>>, AppError> {
    let page = PageRequest::new(params.page, state.config.pagination.page_size)?;
    let listing = state
        .catalog
        .list_categories(params.search.as_deref(), page.window())
        .await?;
    Ok(Json(page.page(listing, &uri)?))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/categories/",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    tag = "Categories",
    security(("bearer_auth" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category = state.catalog.create_category(req.into()).await?;
    tracing::info!(slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

/// Delete a category
///
/// Titles in the category are kept and become uncategorised.
#[utoipa::path(
    delete,
    path = "/categories/{slug}/",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Categories",
    security(("bearer_auth" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.catalog.delete_category(&slug).await? {
        tracing::info!(slug = %slug, "Category deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("Not found.")))
    }
}
