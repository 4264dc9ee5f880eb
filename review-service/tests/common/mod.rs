//! Shared setup for router-level integration tests: the full router over
//! the in-memory store and a recording mailer.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use review_service::{
    build_router,
    config::{
        DatabaseConfig, EmailBackend, EmailConfig, Environment, JwtConfig, PaginationConfig,
        ReviewConfig, SecurityConfig, SwaggerConfig, SwaggerMode,
    },
    models::{Role, User},
    services::{MemoryStore, MockEmailService, UserStore},
    AppState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const PAGE_SIZE: u64 = 3;

pub fn test_config() -> ReviewConfig {
    ReviewConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "review-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            algorithm: Algorithm::HS256,
            signing_key: "integration-test-signing-key".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 1,
            confirmation_code_ttl_seconds: None,
        },
        email: EmailConfig {
            backend: EmailBackend::Console,
            host: "localhost".to_string(),
            port: 25,
            use_tls: false,
            host_user: "noreply@reviews.test".to_string(),
            host_password: String::new(),
        },
        pagination: PaginationConfig {
            page_size: PAGE_SIZE,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Public,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub mail: Arc<MockEmailService>,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ReviewConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mail = Arc::new(MockEmailService::new());
        let state = AppState::new(config, store.clone(), store.clone(), mail.clone());

        Self {
            router: build_router(state),
            store,
            mail,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, token).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), token).await
    }

    pub async fn patch(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(body), token).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None, token).await
    }

    /// Runs the two-step confirmation flow and returns the token pair body.
    pub async fn sign_in(&self, email: &str) -> Value {
        let (status, _) = self
            .post("/auth/email/", serde_json::json!({ "email": email }), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let code = self.mail.last_code_for(email).expect("no code mailed");
        let (status, body) = self
            .post(
                "/auth/token/",
                serde_json::json!({ "email": email, "confirmation_code": code }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "exchange failed: {}", body);
        body
    }

    pub async fn access_token(&self, email: &str) -> String {
        self.sign_in(email).await["access"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    /// Signs in a user whose role has been raised to `role`.
    pub async fn token_with_role(&self, email: &str, role: Role) -> String {
        let mut user: User = self.store.get_or_create_by_email(email).await.unwrap();
        user.role = role;
        self.store.update_user(&user).await.unwrap();
        self.access_token(email).await
    }

    pub async fn admin_token(&self) -> String {
        self.token_with_role("admin@reviews.test", Role::Admin).await
    }
}
