pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Json, Router,
};
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{openapi::security::SecurityScheme, Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{ReviewConfig, SwaggerMode};
use crate::middleware::{admin_or_read_only, authenticate, require_admin, require_authenticated};
use crate::services::{
    CatalogStore, CodeSigner, ConfirmationService, EmailProvider, JwtService, UserStore,
};
use service_core::error::AppError;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::request_code,
        handlers::auth::exchange_code,
        handlers::auth::refresh_token,
        handlers::categories::list_categories,
        handlers::categories::create_category,
        handlers::categories::delete_category,
        handlers::genres::list_genres,
        handlers::genres::create_genre,
        handlers::genres::delete_genre,
        handlers::titles::list_titles,
        handlers::titles::get_title,
        handlers::titles::create_title,
        handlers::titles::update_title,
        handlers::titles::delete_title,
        handlers::users::get_me,
        handlers::users::update_me,
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::EmailRequest,
            dtos::auth::EmailResponse,
            dtos::auth::TokenRequest,
            dtos::auth::TokenPairResponse,
            dtos::auth::RefreshRequest,
            dtos::auth::AccessTokenResponse,
            dtos::catalog::CategoryRequest,
            dtos::catalog::CategoryResponse,
            dtos::catalog::GenreRequest,
            dtos::catalog::GenreResponse,
            dtos::catalog::CreateTitleRequest,
            dtos::catalog::UpdateTitleRequest,
            dtos::catalog::TitleResponse,
            dtos::user::CreateUserRequest,
            dtos::user::UpdateUserRequest,
            dtos::user::UserResponse,
            dtos::pagination::CategoryPage,
            dtos::pagination::GenrePage,
            dtos::pagination::TitlePage,
            dtos::pagination::UserPage,
            models::Role,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Email confirmation codes and JWT issuance"),
        (name = "Categories", description = "Title categories"),
        (name = "Genres", description = "Title genres"),
        (name = "Titles", description = "Reviewable works"),
        (name = "Users", description = "Profiles and user administration"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ReviewConfig>,
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub jwt: JwtService,
    pub confirmation: Arc<ConfirmationService>,
}

impl AppState {
    pub fn new(
        config: ReviewConfig,
        users: Arc<dyn UserStore>,
        catalog: Arc<dyn CatalogStore>,
        email: Arc<dyn EmailProvider>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt);
        let confirmation = ConfirmationService::new(
            users.clone(),
            email,
            CodeSigner::new(&config.jwt),
            jwt.clone(),
        );

        Self {
            config: Arc::new(config),
            users,
            catalog,
            jwt,
            confirmation: Arc::new(confirmation),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/email/", post(handlers::auth::request_code))
        .route("/auth/token/", post(handlers::auth::exchange_code))
        .route("/auth/token/refresh/", post(handlers::auth::refresh_token));

    let catalog_routes = Router::new()
        .route(
            "/categories/",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route(
            "/categories/:slug/",
            delete(handlers::categories::delete_category),
        )
        .route(
            "/genres/",
            get(handlers::genres::list_genres).post(handlers::genres::create_genre),
        )
        .route("/genres/:slug/", delete(handlers::genres::delete_genre))
        .route(
            "/titles/",
            get(handlers::titles::list_titles).post(handlers::titles::create_title),
        )
        .route(
            "/titles/:id/",
            get(handlers::titles::get_title)
                .patch(handlers::titles::update_title)
                .delete(handlers::titles::delete_title),
        )
        .route_layer(from_fn(admin_or_read_only));

    let profile_routes = Router::new()
        .route(
            "/users/me/",
            get(handlers::users::get_me).patch(handlers::users::update_me),
        )
        .route_layer(from_fn(require_authenticated));

    let admin_routes = Router::new()
        .route(
            "/users/",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/:username/",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route_layer(from_fn(require_admin));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(catalog_routes)
        .merge(profile_routes)
        .merge(admin_routes);

    app = match state.config.swagger.enabled {
        SwaggerMode::Public => {
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()))
        }
        SwaggerMode::Authenticated => {
            let docs: Router<AppState> = SwaggerUi::new("/docs")
                .url("/.well-known/openapi.json", ApiDoc::openapi())
                .into();
            app.merge(docs.route_layer(from_fn(require_admin)))
        }
        // The schema stays available for programmatic clients
        SwaggerMode::Disabled => app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        ),
    };

    let allowed_origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    app.layer(from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        )
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.users.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
    })))
}
