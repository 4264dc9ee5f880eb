//! PostgreSQL implementation of the user and catalog stores.

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPool};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::collections::HashMap;

use super::error::ServiceError;
use super::store::{missing_slug, CatalogStore, Listing, UserStore, Window};
use crate::models::{
    Category, Genre, NewCategory, NewGenre, NewUser, Title, TitleChanges, TitleFilter, User,
    USERNAME_ATTEMPTS,
};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, bio, role";

const TITLE_SELECT: &str = r#"
    SELECT t.id, t.name, t.year, t.description,
           c.id AS category_id, c.name AS category_name, c.slug AS category_slug
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
    WHERE TRUE
"#;

#[derive(FromRow)]
struct TitleRow {
    id: i64,
    name: String,
    year: Option<i32>,
    description: String,
    category_id: Option<i64>,
    category_name: Option<String>,
    category_slug: Option<String>,
}

#[derive(FromRow)]
struct TitleGenreRow {
    title_id: i64,
    id: i64,
    name: String,
    slug: String,
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Attaches genres to title rows with one query for the whole batch.
    async fn hydrate_titles(&self, rows: Vec<TitleRow>) -> Result<Vec<Title>, ServiceError> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let links = sqlx::query_as::<_, TitleGenreRow>(
            r#"
            SELECT tg.title_id, g.id, g.name, g.slug
            FROM title_genres tg
            JOIN genres g ON g.id = tg.genre_id
            WHERE tg.title_id = ANY($1)
            ORDER BY g.id
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut genres: HashMap<i64, Vec<Genre>> = HashMap::new();
        for link in links {
            genres.entry(link.title_id).or_default().push(Genre {
                id: link.id,
                name: link.name,
                slug: link.slug,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let category = match (row.category_id, row.category_name, row.category_slug) {
                    (Some(id), Some(name), Some(slug)) => Some(Category { id, name, slug }),
                    _ => None,
                };
                Title {
                    id: row.id,
                    genre: genres.remove(&row.id).unwrap_or_default(),
                    name: row.name,
                    year: row.year,
                    description: row.description,
                    category,
                }
            })
            .collect())
    }

    async fn load_title(&self, id: i64) -> Result<Option<Title>, ServiceError> {
        let mut builder = QueryBuilder::<Postgres>::new(TITLE_SELECT);
        builder.push(" AND t.id = ").push_bind(id);
        let row = builder
            .build_query_as::<TitleRow>()
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate_titles(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

fn push_title_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TitleFilter) {
    if let Some(genre) = &filter.genre {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id \
                 WHERE tg.title_id = t.id AND g.slug = ",
            )
            .push_bind(genre.clone())
            .push(")");
    }
    if let Some(category) = &filter.category {
        builder.push(" AND c.slug = ").push_bind(category.clone());
    }
    if let Some(name) = &filter.name {
        builder
            .push(" AND t.name ILIKE ")
            .push_bind(format!("%{}%", name));
    }
    if let Some(year) = filter.year {
        builder.push(" AND t.year = ").push_bind(year);
    }
}

async fn resolve_genres(
    conn: &mut PgConnection,
    slugs: &[String],
) -> Result<Vec<i64>, ServiceError> {
    let found: Vec<(i64, String)> = sqlx::query_as("SELECT id, slug FROM genres WHERE slug = ANY($1)")
        .bind(slugs)
        .fetch_all(&mut *conn)
        .await?;

    if let Some(missing) = slugs
        .iter()
        .find(|slug| !found.iter().any(|(_, s)| s == *slug))
    {
        return Err(missing_slug("genre", missing));
    }
    Ok(found.into_iter().map(|(id, _)| id).collect())
}

async fn resolve_category(conn: &mut PgConnection, slug: &str) -> Result<i64, ServiceError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| missing_slug("category", slug))
}

async fn link_genres(
    conn: &mut PgConnection,
    title_id: i64,
    genre_ids: &[i64],
) -> Result<(), ServiceError> {
    sqlx::query(
        "INSERT INTO title_genres (title_id, genre_id) SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
    )
    .bind(title_id)
    .bind(genre_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn like_pattern(search: Option<&str>) -> Option<String> {
    search.map(|s| format!("%{}%", s))
}

#[async_trait]
impl UserStore for Database {
    async fn get_or_create_by_email(&self, email: &str) -> Result<User, ServiceError> {
        for attempt in 0..USERNAME_ATTEMPTS {
            let new = NewUser::from_email(email, attempt);
            sqlx::query(
                "INSERT INTO users (username, email) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(&new.username)
            .bind(&new.email)
            .execute(&self.pool)
            .await?;

            // The insert is skipped when either key exists; no row for this
            // email means the username was taken.
            if let Some(user) = self.find_by_email(email).await? {
                return Ok(user);
            }
            tracing::debug!(username = %new.username, "Username taken, retrying");
        }

        Err(ServiceError::duplicate("users_username_key"))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, ServiceError> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_users(
        &self,
        search: Option<&str>,
        window: Window,
    ) -> Result<Listing<User>, ServiceError> {
        let pattern = like_pattern(search);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE ($1::TEXT IS NULL OR username ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE ($1::TEXT IS NULL OR username ILIKE $1) \
             ORDER BY username LIMIT $2 OFFSET $3",
            USER_COLUMNS
        ))
        .bind(&pattern)
        .bind(window.sql_limit())
        .bind(window.sql_offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Listing {
            items,
            total: total as u64,
        })
    }

    async fn create_user(&self, user: NewUser) -> Result<User, ServiceError> {
        Ok(sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, bio, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_user(&self, user: &User) -> Result<User, ServiceError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $2, email = $3, first_name = $4, last_name = $5, bio = $6, role = $7
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(user.role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServiceError::NotFound("User"))
    }

    async fn delete_user(&self, username: &str) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                ServiceError::Database(e)
            })?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for Database {
    async fn list_categories(
        &self,
        search: Option<&str>,
        window: Window,
    ) -> Result<Listing<Category>, ServiceError> {
        let pattern = like_pattern(search);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM categories WHERE ($1::TEXT IS NULL OR name ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug FROM categories WHERE ($1::TEXT IS NULL OR name ILIKE $1) \
             ORDER BY name, id LIMIT $2 OFFSET $3",
        )
        .bind(&pattern)
        .bind(window.sql_limit())
        .bind(window.sql_offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Listing {
            items,
            total: total as u64,
        })
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, ServiceError> {
        Ok(sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(&category.name)
        .bind(&category.slug)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_category(&self, slug: &str) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM categories WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_genres(
        &self,
        search: Option<&str>,
        window: Window,
    ) -> Result<Listing<Genre>, ServiceError> {
        let pattern = like_pattern(search);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM genres WHERE ($1::TEXT IS NULL OR name ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Genre>(
            "SELECT id, name, slug FROM genres WHERE ($1::TEXT IS NULL OR name ILIKE $1) \
             ORDER BY name, id LIMIT $2 OFFSET $3",
        )
        .bind(&pattern)
        .bind(window.sql_limit())
        .bind(window.sql_offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Listing {
            items,
            total: total as u64,
        })
    }

    async fn create_genre(&self, genre: NewGenre) -> Result<Genre, ServiceError> {
        Ok(sqlx::query_as::<_, Genre>(
            "INSERT INTO genres (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(&genre.name)
        .bind(&genre.slug)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_genre(&self, slug: &str) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM genres WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_titles(
        &self,
        filter: &TitleFilter,
        window: Window,
    ) -> Result<Listing<Title>, ServiceError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM titles t LEFT JOIN categories c ON c.id = t.category_id WHERE TRUE",
        );
        push_title_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(TITLE_SELECT);
        push_title_filters(&mut select, filter);
        select
            .push(" ORDER BY t.name, t.id LIMIT ")
            .push_bind(window.sql_limit())
            .push(" OFFSET ")
            .push_bind(window.sql_offset());
        let rows = select
            .build_query_as::<TitleRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Listing {
            items: self.hydrate_titles(rows).await?,
            total: total as u64,
        })
    }

    async fn find_title(&self, id: i64) -> Result<Option<Title>, ServiceError> {
        self.load_title(id).await
    }

    async fn create_title(&self, changes: TitleChanges) -> Result<Title, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let genre_ids = match &changes.genre {
            Some(slugs) => resolve_genres(&mut tx, slugs).await?,
            None => Vec::new(),
        };
        let category_id = match &changes.category {
            Some(slug) => Some(resolve_category(&mut tx, slug).await?),
            None => None,
        };

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO titles (name, year, description, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(changes.name.unwrap_or_default())
        .bind(changes.year)
        .bind(changes.description.unwrap_or_default())
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;

        link_genres(&mut tx, id, &genre_ids).await?;
        tx.commit().await?;

        self.load_title(id)
            .await?
            .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("Title {} vanished after insert", id)))
    }

    async fn update_title(
        &self,
        id: i64,
        changes: TitleChanges,
    ) -> Result<Option<Title>, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM titles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let category_id = match &changes.category {
            Some(slug) => Some(resolve_category(&mut tx, slug).await?),
            None => None,
        };

        sqlx::query(
            r#"
            UPDATE titles
            SET name = COALESCE($2, name),
                year = COALESCE($3, year),
                description = COALESCE($4, description),
                category_id = COALESCE($5, category_id)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(changes.year)
        .bind(&changes.description)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;

        if let Some(slugs) = &changes.genre {
            let genre_ids = resolve_genres(&mut tx, slugs).await?;
            sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_genres(&mut tx, id, &genre_ids).await?;
        }

        tx.commit().await?;
        self.load_title(id).await
    }

    async fn delete_title(&self, id: i64) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
