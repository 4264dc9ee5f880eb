use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::validate_slug;
use crate::models::{Category, Genre, NewCategory, NewGenre, Title, TitleChanges};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    #[schema(example = "Movie")]
    pub name: String,
    #[schema(example = "movie")]
    pub slug: String,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            name: c.name,
            slug: c.slug,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenreResponse {
    #[schema(example = "Drama")]
    pub name: String,
    #[schema(example = "drama")]
    pub slug: String,
}

impl From<Genre> for GenreResponse {
    fn from(g: Genre) -> Self {
        Self {
            name: g.name,
            slug: g.slug,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 256, message = "Ensure this field has between 1 and 256 characters."))]
    pub name: String,

    #[validate(
        length(max = 50, message = "Ensure this field has no more than 50 characters."),
        custom(function = "validate_slug")
    )]
    pub slug: String,
}

impl From<CategoryRequest> for NewCategory {
    fn from(req: CategoryRequest) -> Self {
        Self {
            name: req.name,
            slug: req.slug,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GenreRequest {
    #[validate(length(min = 1, max = 30, message = "Ensure this field has between 1 and 30 characters."))]
    pub name: String,

    #[validate(
        length(max = 50, message = "Ensure this field has no more than 50 characters."),
        custom(function = "validate_slug")
    )]
    pub slug: String,
}

impl From<GenreRequest> for NewGenre {
    fn from(req: GenreRequest) -> Self {
        Self {
            name: req.name,
            slug: req.slug,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TitleResponse {
    pub id: i64,
    #[schema(example = "The Godfather")]
    pub name: String,
    #[schema(example = 1972)]
    pub year: Option<i32>,
    pub description: String,
    pub genre: Vec<GenreResponse>,
    pub category: Option<CategoryResponse>,
}

impl From<Title> for TitleResponse {
    fn from(t: Title) -> Self {
        Self {
            id: t.id,
            name: t.name,
            year: t.year,
            description: t.description,
            genre: t.genre.into_iter().map(Into::into).collect(),
            category: t.category.map(Into::into),
        }
    }
}

/// Relations are given by slug.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTitleRequest {
    #[validate(length(min = 1, max = 300, message = "Ensure this field has between 1 and 300 characters."))]
    pub name: String,

    pub year: Option<i32>,

    #[validate(length(max = 1000, message = "Ensure this field has no more than 1000 characters."))]
    pub description: Option<String>,

    #[schema(example = json!(["drama", "crime"]))]
    pub genre: Vec<String>,

    #[schema(example = "movie")]
    pub category: Option<String>,
}

impl From<CreateTitleRequest> for TitleChanges {
    fn from(req: CreateTitleRequest) -> Self {
        Self {
            name: Some(req.name),
            year: req.year,
            description: req.description,
            genre: Some(req.genre),
            category: req.category,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 300, message = "Ensure this field has between 1 and 300 characters."))]
    pub name: Option<String>,

    pub year: Option<i32>,

    #[validate(length(max = 1000, message = "Ensure this field has no more than 1000 characters."))]
    pub description: Option<String>,

    pub genre: Option<Vec<String>>,

    pub category: Option<String>,
}

impl From<UpdateTitleRequest> for TitleChanges {
    fn from(req: UpdateTitleRequest) -> Self {
        Self {
            name: req.name,
            year: req.year,
            description: req.description,
            genre: req.genre,
            category: req.category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_request_checks_slug_and_name_length() {
        let req = GenreRequest {
            name: "x".repeat(31),
            slug: "bad slug".to_string(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("slug"));
    }

    #[test]
    fn create_title_maps_to_full_changes() {
        let changes: TitleChanges = CreateTitleRequest {
            name: "Heat".to_string(),
            year: Some(1995),
            description: None,
            genre: vec![],
            category: None,
        }
        .into();
        assert_eq!(changes.name.as_deref(), Some("Heat"));
        assert_eq!(changes.genre, Some(vec![]));
        assert!(changes.category.is_none());
    }
}
