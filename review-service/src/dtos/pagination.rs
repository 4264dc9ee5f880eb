//! Page-number pagination: `?page=N` in, `{count, next, previous, results}` out.

use axum::http::Uri;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use utoipa::{IntoParams, ToSchema};

use super::catalog::{CategoryResponse, GenreResponse, TitleResponse};
use super::user::UserResponse;
use crate::services::{Listing, Window};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchParams {
    /// 1-based page number
    pub page: Option<u64>,
    /// Case-insensitive substring match
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TitleParams {
    pub page: Option<u64>,
    /// Genre slug
    pub genre: Option<String>,
    /// Category slug
    pub category: Option<String>,
    /// Case-insensitive substring of the title name
    pub name: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[aliases(
    CategoryPage = Page<CategoryResponse>,
    GenrePage = Page<GenreResponse>,
    TitlePage = Page<TitleResponse>,
    UserPage = Page<UserResponse>
)]
pub struct Page<T> {
    pub count: u64,
    /// Path and query of the next page
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u64,
    pub size: u64,
}

fn invalid_page() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Invalid page"))
}

impl PageRequest {
    pub fn new(page: Option<u64>, size: u64) -> Result<Self, AppError> {
        match page.unwrap_or(1) {
            0 => Err(invalid_page()),
            number => Ok(Self { number, size }),
        }
    }

    pub fn window(&self) -> Window {
        Window {
            limit: self.size,
            offset: (self.number - 1).saturating_mul(self.size),
        }
    }

    /// Wraps a listing fetched with `self.window()`. Pages past the end are
    /// rejected; the first page of an empty set is not.
    pub fn page<U, T>(&self, listing: Listing<U>, uri: &Uri) -> Result<Page<T>, AppError>
    where
        T: From<U>,
    {
        let last = listing.total.div_ceil(self.size).max(1);
        if self.number > last {
            return Err(invalid_page());
        }

        let next = (self.number < last).then(|| page_link(uri, Some(self.number + 1)));
        let previous = match self.number {
            1 => None,
            2 => Some(page_link(uri, None)),
            n => Some(page_link(uri, Some(n - 1))),
        };

        Ok(Page {
            count: listing.total,
            next,
            previous,
            results: listing.items.into_iter().map(T::from).collect(),
        })
    }
}

/// Rewrites the `page` parameter of `uri`, keeping every other parameter.
fn page_link(uri: &Uri, page: Option<u64>) -> String {
    let mut params: Vec<(String, String)> = uri
        .query()
        .and_then(|q| serde_urlencoded::from_str(q).ok())
        .unwrap_or_default();
    params.retain(|(key, _)| key != "page");
    if let Some(page) = page {
        params.push(("page".to_string(), page.to_string()));
    }

    let query = serde_urlencoded::to_string(&params).unwrap_or_default();
    if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    }
}
