//! Titles (films, books, songs...) with their genres and category.

use super::{Category, Genre};

#[derive(Debug, Clone, PartialEq)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: Option<i32>,
    pub description: String,
    pub genre: Vec<Genre>,
    pub category: Option<Category>,
}

/// Field values for create and partial update. Relations are referenced by
/// slug; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub category: Option<String>,
}

/// List filters; every set field must match.
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    pub genre: Option<String>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

impl TitleFilter {
    pub fn matches(&self, title: &Title) -> bool {
        if let Some(genre) = &self.genre {
            if !title.genre.iter().any(|g| &g.slug == genre) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if title.category.as_ref().map(|c| &c.slug) != Some(category) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !title.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(year) = self.year {
            if title.year != Some(year) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title() -> Title {
        Title {
            id: 1,
            name: "The Matrix".to_string(),
            year: Some(1999),
            description: String::new(),
            genre: vec![Genre {
                id: 1,
                name: "Sci-Fi".to_string(),
                slug: "sci-fi".to_string(),
            }],
            category: Some(Category {
                id: 1,
                name: "Movie".to_string(),
                slug: "movie".to_string(),
            }),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(TitleFilter::default().matches(&title()));
    }

    #[test]
    fn filters_combine_with_and() {
        let filter = TitleFilter {
            genre: Some("sci-fi".to_string()),
            category: Some("movie".to_string()),
            name: Some("matrix".to_string()),
            year: Some(1999),
        };
        assert!(filter.matches(&title()));

        let filter = TitleFilter {
            genre: Some("sci-fi".to_string()),
            year: Some(2003),
            ..Default::default()
        };
        assert!(!filter.matches(&title()));
    }

    #[test]
    fn category_filter_rejects_uncategorised_titles() {
        let mut t = title();
        t.category = None;
        let filter = TitleFilter {
            category: Some("movie".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&t));
    }
}
