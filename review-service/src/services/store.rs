use async_trait::async_trait;

use super::error::ServiceError;
use crate::models::{
    Category, Genre, NewCategory, NewGenre, NewUser, Title, TitleChanges, TitleFilter, User,
};

/// Slice of an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

impl Window {
    /// `LIMIT` bind value. PostgreSQL takes BIGINT, so values saturate at `i64::MAX`.
    pub fn sql_limit(&self) -> i64 {
        i64::try_from(self.limit).unwrap_or(i64::MAX)
    }

    /// `OFFSET` bind value, saturating like [`Window::sql_limit`].
    pub fn sql_offset(&self) -> i64 {
        i64::try_from(self.offset).unwrap_or(i64::MAX)
    }
}

/// One page of rows plus the size of the whole result set.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Listing<T> {
    /// Applies `window` to an already filtered and ordered set.
    pub fn from_all(all: Vec<T>, window: Window) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
            .collect();
        Self { items, total }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the user with this email, creating it on first contact.
    /// Concurrent calls for the same email yield the same row.
    async fn get_or_create_by_email(&self, email: &str) -> Result<User, ServiceError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, ServiceError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, ServiceError>;

    /// Ordered by username; `search` is a case-insensitive substring of it.
    async fn list_users(
        &self,
        search: Option<&str>,
        window: Window,
    ) -> Result<Listing<User>, ServiceError>;

    async fn create_user(&self, user: NewUser) -> Result<User, ServiceError>;

    /// Overwrites every mutable field of the row with `user.id`.
    async fn update_user(&self, user: &User) -> Result<User, ServiceError>;

    async fn delete_user(&self, username: &str) -> Result<bool, ServiceError>;

    async fn health_check(&self) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(
        &self,
        search: Option<&str>,
        window: Window,
    ) -> Result<Listing<Category>, ServiceError>;

    async fn create_category(&self, category: NewCategory) -> Result<Category, ServiceError>;

    async fn delete_category(&self, slug: &str) -> Result<bool, ServiceError>;

    async fn list_genres(
        &self,
        search: Option<&str>,
        window: Window,
    ) -> Result<Listing<Genre>, ServiceError>;

    async fn create_genre(&self, genre: NewGenre) -> Result<Genre, ServiceError>;

    async fn delete_genre(&self, slug: &str) -> Result<bool, ServiceError>;

    /// Ordered by name, then id.
    async fn list_titles(
        &self,
        filter: &TitleFilter,
        window: Window,
    ) -> Result<Listing<Title>, ServiceError>;

    async fn find_title(&self, id: i64) -> Result<Option<Title>, ServiceError>;

    /// `changes.name` must be set; unknown genre or category slugs are
    /// rejected as invalid input.
    async fn create_title(&self, changes: TitleChanges) -> Result<Title, ServiceError>;

    async fn update_title(
        &self,
        id: i64,
        changes: TitleChanges,
    ) -> Result<Option<Title>, ServiceError>;

    async fn delete_title(&self, id: i64) -> Result<bool, ServiceError>;
}

pub(crate) fn missing_slug(field: &'static str, slug: &str) -> ServiceError {
    ServiceError::invalid(field, format!("Object with slug={} does not exist.", slug))
}
