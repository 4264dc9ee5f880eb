//! Store contract checks against a live PostgreSQL.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use review_service::{
    config::DatabaseConfig,
    db,
    models::{NewCategory, NewGenre, NewUser, TitleChanges, TitleFilter},
    services::{CatalogStore, Database, ServiceError, UserStore, Window},
};
use uuid::Uuid;

const ALL: Window = Window {
    limit: 100,
    offset: 0,
};

async fn database() -> Database {
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        max_connections: 5,
        min_connections: 1,
    };
    let pool = db::create_pool(&config).await.expect("Failed to connect");
    db::run_migrations(&pool).await.expect("Failed to migrate");
    Database::new(pool)
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn get_or_create_returns_same_row() {
    let db = database().await;
    let email = format!("{}@x.com", unique("pg"));

    let first = db.get_or_create_by_email(&email).await.unwrap();
    let second = db.get_or_create_by_email(&email).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.username, email);
    db.delete_user(&first.username).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn get_or_create_handles_taken_username_and_long_email() {
    let db = database().await;
    let wanted = format!("{}@x.com", unique("owner"));
    let squatter = db
        .create_user(NewUser {
            username: wanted.clone(),
            email: format!("{}@x.com", unique("squatter")),
            ..Default::default()
        })
        .await
        .unwrap();

    let owner = db.get_or_create_by_email(&wanted).await.unwrap();
    assert_eq!(owner.email, wanted);
    assert_ne!(owner.username, wanted);

    let long = format!("{}@{}.example.com", unique("l"), "d".repeat(150));
    let long_user = db.get_or_create_by_email(&long).await.unwrap();
    assert_eq!(long_user.username.chars().count(), 150);

    let far = db
        .list_users(None, Window { limit: 10, offset: u64::MAX })
        .await
        .unwrap();
    assert!(far.items.is_empty());

    for username in [squatter.username, owner.username, long_user.username] {
        db.delete_user(&username).await.unwrap();
    }
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn concurrent_get_or_create_yields_one_user() {
    let db = database().await;
    let email = format!("{}@x.com", unique("race"));

    let (a, b) = tokio::join!(
        db.get_or_create_by_email(&email),
        db.get_or_create_by_email(&email)
    );

    assert_eq!(a.unwrap().id, b.unwrap().id);
    db.delete_user(&email).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn duplicate_slug_maps_to_field_error() {
    let db = database().await;
    let slug = unique("genre");
    db.create_genre(NewGenre {
        name: "Drama".to_string(),
        slug: slug.clone(),
    })
    .await
    .unwrap();

    let err = db
        .create_genre(NewGenre {
            name: "Drama again".to_string(),
            slug: slug.clone(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Invalid { field: "slug", .. }));
    db.delete_genre(&slug).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn title_relations_round_trip() {
    let db = database().await;
    let genre = unique("g");
    let category = unique("c");
    db.create_genre(NewGenre {
        name: "Noir".to_string(),
        slug: genre.clone(),
    })
    .await
    .unwrap();
    db.create_category(NewCategory {
        name: "Movie".to_string(),
        slug: category.clone(),
    })
    .await
    .unwrap();

    let title = db
        .create_title(TitleChanges {
            name: Some(unique("title")),
            year: Some(1944),
            genre: Some(vec![genre.clone()]),
            category: Some(category.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(title.genre.len(), 1);
    assert_eq!(title.category.as_ref().unwrap().slug, category);

    let filter = TitleFilter {
        genre: Some(genre.clone()),
        ..Default::default()
    };
    assert_eq!(db.list_titles(&filter, ALL).await.unwrap().total, 1);

    db.delete_category(&category).await.unwrap();
    let reloaded = db.find_title(title.id).await.unwrap().unwrap();
    assert!(reloaded.category.is_none());

    assert!(db.delete_title(title.id).await.unwrap());
    db.delete_genre(&genre).await.unwrap();
}
