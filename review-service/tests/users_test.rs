mod common;

use axum::http::StatusCode;
use common::TestApp;
use review_service::models::Role;
use serde_json::json;

#[tokio::test]
async fn profile_requires_authentication() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/users/me/", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication credentials were not provided.");
}

#[tokio::test]
async fn malformed_token_is_rejected() {
    let app = TestApp::spawn();

    let (status, _) = app.get("/titles/", Some("not-a-jwt")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_patch_updates_fields_but_not_role() {
    let app = TestApp::spawn();
    let token = app.access_token("a@x.com").await;

    let (status, body) = app
        .patch(
            "/users/me/",
            json!({ "username": "alice", "bio": "Noir fan", "role": "admin" }),
            Some(&token),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["bio"], "Noir fan");
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn profile_patch_rejects_taken_username() {
    let app = TestApp::spawn();
    app.access_token("b@x.com").await;
    let token = app.access_token("a@x.com").await;

    let (status, body) = app
        .patch("/users/me/", json!({ "username": "b@x.com" }), Some(&token))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["username"].is_array());
}

#[tokio::test]
async fn non_admin_is_forbidden_from_user_admin() {
    let app = TestApp::spawn();
    let token = app.token_with_role("mod@x.com", Role::Moderator).await;

    let (status, body) = app.get("/users/", Some(&token)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You do not have permission to perform this action.");
}

#[tokio::test]
async fn anonymous_is_unauthorized_on_user_admin() {
    let app = TestApp::spawn();

    let (status, _) = app.get("/users/", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_manages_users_by_username() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;

    let (status, body) = app
        .post(
            "/users/",
            json!({ "username": "critic", "email": "critic@x.com", "role": "moderator" }),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "moderator");

    let (status, body) = app.get("/users/critic/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "critic@x.com");

    let (status, body) = app
        .patch("/users/critic/", json!({ "role": "admin" }), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    let (status, _) = app.delete("/users/critic/", Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/users/critic/", Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_create_rejects_duplicate_email_and_reserved_name() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;

    let (status, body) = app
        .post(
            "/users/",
            json!({ "username": "other", "email": "admin@reviews.test" }),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["email"].is_array());

    let (status, body) = app
        .post("/users/", json!({ "username": "me", "email": "me@x.com" }), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["username"].is_array());
}

#[tokio::test]
async fn user_list_is_paginated_and_searchable() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;
    for name in ["ann", "bob", "cat", "dan"] {
        app.post(
            "/users/",
            json!({ "username": name, "email": format!("{}@x.com", name) }),
            Some(&admin),
        )
        .await;
    }

    // admin@reviews.test plus four created users, page size three
    let (status, body) = app.get("/users/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 5);
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
    assert_eq!(body["next"], "/users/?page=2");
    assert!(body["previous"].is_null());

    let (_, body) = app.get("/users/?search=BO", Some(&admin)).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["username"], "bob");
}

#[tokio::test]
async fn deleted_user_token_stops_working() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;
    let token = app.access_token("gone@x.com").await;

    let (status, _) = app.delete("/users/gone@x.com/", Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/users/me/", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
