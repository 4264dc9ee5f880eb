pub mod auth;
pub mod categories;
pub mod genres;
pub mod titles;
pub mod users;
