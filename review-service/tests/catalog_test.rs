mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use common::TestApp;
use review_service::models::Role;
use serde_json::json;

async fn seed(app: &TestApp, admin: &str) {
    for (name, slug) in [("Movie", "movie"), ("Book", "book")] {
        let (status, _) = app
            .post("/categories/", json!({ "name": name, "slug": slug }), Some(admin))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    for (name, slug) in [("Drama", "drama"), ("Crime", "crime")] {
        let (status, _) = app
            .post("/genres/", json!({ "name": name, "slug": slug }), Some(admin))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn anonymous_can_read_catalog() {
    let app = TestApp::spawn();

    for uri in ["/categories/", "/genres/", "/titles/"] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body["count"], 0);
        assert_eq!(body["results"], json!([]));
    }
}

#[tokio::test]
async fn anonymous_writes_are_unauthorized() {
    let app = TestApp::spawn();

    let (status, _) = app
        .post("/genres/", json!({ "name": "Drama", "slug": "drama" }), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.delete("/categories/movie/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_writes_are_forbidden() {
    let app = TestApp::spawn();
    let token = app.token_with_role("mod@x.com", Role::Moderator).await;

    let (status, _) = app
        .post("/categories/", json!({ "name": "Movie", "slug": "movie" }), Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/titles/", json!({ "name": "Heat", "genre": [] }), Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_slug_is_a_field_error() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;
    seed(&app, &admin).await;

    let (status, body) = app
        .post("/genres/", json!({ "name": "Also drama", "slug": "drama" }), Some(&admin))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["slug"].is_array());
}

#[tokio::test]
async fn invalid_slug_is_rejected() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;

    let (status, body) = app
        .post("/categories/", json!({ "name": "Films", "slug": "bad slug!" }), Some(&admin))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["slug"].is_array());
}

#[tokio::test]
async fn categories_search_by_name() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;
    seed(&app, &admin).await;

    let (_, body) = app.get("/categories/?search=mov", None).await;

    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0], json!({ "name": "Movie", "slug": "movie" }));
}

#[tokio::test]
async fn delete_missing_slug_is_not_found() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;

    let (status, _) = app.delete("/genres/nope/", Some(&admin)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn title_lifecycle() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;
    seed(&app, &admin).await;

    let (status, created) = app
        .post(
            "/titles/",
            json!({
                "name": "The Godfather",
                "year": 1972,
                "description": "Family business",
                "genre": ["drama", "crime"],
                "category": "movie"
            }),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["category"], json!({ "name": "Movie", "slug": "movie" }));
    assert_eq!(created["genre"].as_array().unwrap().len(), 2);

    let id = created["id"].as_i64().unwrap();
    let uri = format!("/titles/{}/", id);

    let (status, fetched) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, updated) = app
        .patch(&uri, json!({ "genre": ["crime"], "category": "book" }), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "The Godfather");
    assert_eq!(updated["genre"], json!([{ "name": "Crime", "slug": "crime" }]));
    assert_eq!(updated["category"]["slug"], "book");

    let (status, _) = app.delete(&uri, Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn future_year_is_rejected() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;
    let next_year = Utc::now().year() + 1;

    let (status, body) = app
        .post(
            "/titles/",
            json!({ "name": "Sequel", "year": next_year, "genre": [] }),
            Some(&admin),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["year"], json!(["Is your title from the future?"]));
}

#[tokio::test]
async fn unknown_genre_slug_is_rejected() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;
    seed(&app, &admin).await;

    let (status, body) = app
        .post(
            "/titles/",
            json!({ "name": "Heat", "genre": ["thriller"] }),
            Some(&admin),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"]["genre"],
        json!(["Object with slug=thriller does not exist."])
    );
}

#[tokio::test]
async fn deleting_category_keeps_titles() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;
    seed(&app, &admin).await;
    let (_, created) = app
        .post(
            "/titles/",
            json!({ "name": "Heat", "genre": [], "category": "movie" }),
            Some(&admin),
        )
        .await;

    let (status, _) = app.delete("/categories/movie/", Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, title) = app.get(&format!("/titles/{}/", created["id"]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(title["category"].is_null());
}

#[tokio::test]
async fn titles_filter_and_paginate() {
    let app = TestApp::spawn();
    let admin = app.admin_token().await;
    seed(&app, &admin).await;

    let titles = [
        ("Alien", 1979, "movie", "drama"),
        ("Brazil", 1985, "movie", "drama"),
        ("Casino", 1995, "movie", "crime"),
        ("Dune", 1965, "book", "drama"),
        ("Emma", 1815, "book", "drama"),
    ];
    for (name, year, category, genre) in titles {
        let (status, _) = app
            .post(
                "/titles/",
                json!({ "name": name, "year": year, "category": category, "genre": [genre] }),
                Some(&admin),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, page1) = app.get("/titles/?genre=drama", None).await;
    assert_eq!(page1["count"], 4);
    assert_eq!(page1["results"].as_array().unwrap().len(), 3);
    assert_eq!(page1["results"][0]["name"], "Alien");
    assert_eq!(page1["next"], "/titles/?genre=drama&page=2");
    assert!(page1["previous"].is_null());

    let (_, page2) = app.get("/titles/?genre=drama&page=2", None).await;
    assert_eq!(page2["results"].as_array().unwrap().len(), 1);
    assert_eq!(page2["results"][0]["name"], "Emma");
    assert!(page2["next"].is_null());
    assert_eq!(page2["previous"], "/titles/?genre=drama");

    let (_, by_category) = app.get("/titles/?category=book&name=DU", None).await;
    assert_eq!(by_category["count"], 1);
    assert_eq!(by_category["results"][0]["name"], "Dune");

    let (_, by_year) = app.get("/titles/?year=1995", None).await;
    assert_eq!(by_year["count"], 1);
    assert_eq!(by_year["results"][0]["name"], "Casino");
}

#[tokio::test]
async fn out_of_range_page_is_not_found() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/titles/?page=2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid page");

    let (status, _) = app.get("/genres/?page=0", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/categories/?page=18446744073709551615", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid page");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/.well-known/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/auth/token/"].is_object());
    assert!(body["paths"]["/titles/{id}/"].is_object());
}
