//! In-process store used by tests and database-less local runs.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use super::error::ServiceError;
use super::store::{missing_slug, CatalogStore, Listing, UserStore, Window};
use crate::models::{
    Category, Genre, NewCategory, NewGenre, NewUser, Title, TitleChanges, TitleFilter, User,
    USERNAME_ATTEMPTS,
};

#[derive(Debug, Clone)]
struct StoredTitle {
    id: i64,
    name: String,
    year: Option<i32>,
    description: String,
    genre_ids: Vec<i64>,
    category_id: Option<i64>,
}

#[derive(Default)]
struct State {
    users: Vec<User>,
    categories: Vec<Category>,
    genres: Vec<Genre>,
    titles: Vec<StoredTitle>,
    last_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn check_user_unique(&self, id: i64, username: &str, email: &str) -> Result<(), ServiceError> {
        let others = self.users.iter().filter(|u| u.id != id);
        for other in others {
            if other.username == username {
                return Err(ServiceError::duplicate("users_username_key"));
            }
            if other.email == email {
                return Err(ServiceError::duplicate("users_email_key"));
            }
        }
        Ok(())
    }

    fn genre_ids(&self, slugs: &[String]) -> Result<Vec<i64>, ServiceError> {
        let mut ids = slugs
            .iter()
            .map(|slug| {
                self.genres
                    .iter()
                    .find(|g| &g.slug == slug)
                    .map(|g| g.id)
                    .ok_or_else(|| missing_slug("genre", slug))
            })
            .collect::<Result<Vec<_>, _>>()?;
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    fn category_id(&self, slug: &str) -> Result<i64, ServiceError> {
        self.categories
            .iter()
            .find(|c| c.slug == slug)
            .map(|c| c.id)
            .ok_or_else(|| missing_slug("category", slug))
    }

    fn hydrate(&self, stored: &StoredTitle) -> Title {
        Title {
            id: stored.id,
            name: stored.name.clone(),
            year: stored.year,
            description: stored.description.clone(),
            genre: stored
                .genre_ids
                .iter()
                .filter_map(|id| self.genres.iter().find(|g| g.id == *id).cloned())
                .collect(),
            category: stored
                .category_id
                .and_then(|id| self.categories.iter().find(|c| c.id == id).cloned()),
        }
    }
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
        None => true,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, ServiceError> {
        self.state
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Memory store poisoned: {}", e)))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_or_create_by_email(&self, email: &str) -> Result<User, ServiceError> {
        let mut state = self.state()?;
        if let Some(user) = state.users.iter().find(|u| u.email == email) {
            return Ok(user.clone());
        }

        let new = (0..USERNAME_ATTEMPTS)
            .map(|attempt| NewUser::from_email(email, attempt))
            .find(|new| !state.users.iter().any(|u| u.username == new.username))
            .ok_or_else(|| ServiceError::duplicate("users_username_key"))?;
        let user = User {
            id: state.next_id(),
            username: new.username,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            bio: new.bio,
            role: new.role,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.state()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, ServiceError> {
        Ok(self.state()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        Ok(self
            .state()?
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(
        &self,
        search: Option<&str>,
        window: Window,
    ) -> Result<Listing<User>, ServiceError> {
        let mut users: Vec<User> = self
            .state()?
            .users
            .iter()
            .filter(|u| contains_ci(&u.username, search))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(Listing::from_all(users, window))
    }

    async fn create_user(&self, new: NewUser) -> Result<User, ServiceError> {
        let mut state = self.state()?;
        state.check_user_unique(0, &new.username, &new.email)?;
        let user = User {
            id: state.next_id(),
            username: new.username,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            bio: new.bio,
            role: new.role,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<User, ServiceError> {
        let mut state = self.state()?;
        state.check_user_unique(user.id, &user.username, &user.email)?;
        let slot = state
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(ServiceError::NotFound("User"))?;
        *slot = user.clone();
        Ok(user.clone())
    }

    async fn delete_user(&self, username: &str) -> Result<bool, ServiceError> {
        let mut state = self.state()?;
        let before = state.users.len();
        state.users.retain(|u| u.username != username);
        Ok(state.users.len() != before)
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        self.state().map(|_| ())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_categories(
        &self,
        search: Option<&str>,
        window: Window,
    ) -> Result<Listing<Category>, ServiceError> {
        let mut items: Vec<Category> = self
            .state()?
            .categories
            .iter()
            .filter(|c| contains_ci(&c.name, search))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(Listing::from_all(items, window))
    }

    async fn create_category(&self, new: NewCategory) -> Result<Category, ServiceError> {
        let mut state = self.state()?;
        if state.categories.iter().any(|c| c.slug == new.slug) {
            return Err(ServiceError::duplicate("categories_slug_key"));
        }
        let category = Category {
            id: state.next_id(),
            name: new.name,
            slug: new.slug,
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn delete_category(&self, slug: &str) -> Result<bool, ServiceError> {
        let mut state = self.state()?;
        let Some(id) = state.categories.iter().find(|c| c.slug == slug).map(|c| c.id) else {
            return Ok(false);
        };
        state.categories.retain(|c| c.id != id);
        for title in state.titles.iter_mut() {
            if title.category_id == Some(id) {
                title.category_id = None;
            }
        }
        Ok(true)
    }

    async fn list_genres(
        &self,
        search: Option<&str>,
        window: Window,
    ) -> Result<Listing<Genre>, ServiceError> {
        let mut items: Vec<Genre> = self
            .state()?
            .genres
            .iter()
            .filter(|g| contains_ci(&g.name, search))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(Listing::from_all(items, window))
    }

    async fn create_genre(&self, new: NewGenre) -> Result<Genre, ServiceError> {
        let mut state = self.state()?;
        if state.genres.iter().any(|g| g.slug == new.slug) {
            return Err(ServiceError::duplicate("genres_slug_key"));
        }
        let genre = Genre {
            id: state.next_id(),
            name: new.name,
            slug: new.slug,
        };
        state.genres.push(genre.clone());
        Ok(genre)
    }

    async fn delete_genre(&self, slug: &str) -> Result<bool, ServiceError> {
        let mut state = self.state()?;
        let Some(id) = state.genres.iter().find(|g| g.slug == slug).map(|g| g.id) else {
            return Ok(false);
        };
        state.genres.retain(|g| g.id != id);
        for title in state.titles.iter_mut() {
            title.genre_ids.retain(|g| *g != id);
        }
        Ok(true)
    }

    async fn list_titles(
        &self,
        filter: &TitleFilter,
        window: Window,
    ) -> Result<Listing<Title>, ServiceError> {
        let state = self.state()?;
        let mut titles: Vec<Title> = state
            .titles
            .iter()
            .map(|t| state.hydrate(t))
            .filter(|t| filter.matches(t))
            .collect();
        titles.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(Listing::from_all(titles, window))
    }

    async fn find_title(&self, id: i64) -> Result<Option<Title>, ServiceError> {
        let state = self.state()?;
        Ok(state
            .titles
            .iter()
            .find(|t| t.id == id)
            .map(|t| state.hydrate(t)))
    }

    async fn create_title(&self, changes: TitleChanges) -> Result<Title, ServiceError> {
        let mut state = self.state()?;
        let genre_ids = state.genre_ids(changes.genre.as_deref().unwrap_or_default())?;
        let category_id = changes
            .category
            .as_deref()
            .map(|slug| state.category_id(slug))
            .transpose()?;

        let stored = StoredTitle {
            id: state.next_id(),
            name: changes.name.unwrap_or_default(),
            year: changes.year,
            description: changes.description.unwrap_or_default(),
            genre_ids,
            category_id,
        };
        let title = state.hydrate(&stored);
        state.titles.push(stored);
        Ok(title)
    }

    async fn update_title(
        &self,
        id: i64,
        changes: TitleChanges,
    ) -> Result<Option<Title>, ServiceError> {
        let mut state = self.state()?;
        let Some(mut stored) = state.titles.iter().find(|t| t.id == id).cloned() else {
            return Ok(None);
        };

        if let Some(slugs) = &changes.genre {
            stored.genre_ids = state.genre_ids(slugs)?;
        }
        if let Some(slug) = &changes.category {
            stored.category_id = Some(state.category_id(slug)?);
        }
        if let Some(name) = changes.name {
            stored.name = name;
        }
        if let Some(year) = changes.year {
            stored.year = Some(year);
        }
        if let Some(description) = changes.description {
            stored.description = description;
        }

        let title = state.hydrate(&stored);
        if let Some(slot) = state.titles.iter_mut().find(|t| t.id == id) {
            *slot = stored;
        }
        Ok(Some(title))
    }

    async fn delete_title(&self, id: i64) -> Result<bool, ServiceError> {
        let mut state = self.state()?;
        let before = state.titles.len();
        state.titles.retain(|t| t.id != id);
        Ok(state.titles.len() != before)
    }
}
