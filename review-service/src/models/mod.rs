pub mod category;
pub mod genre;
pub mod title;
pub mod user;

pub use category::{Category, NewCategory};
pub use genre::{Genre, NewGenre};
pub use title::{Title, TitleChanges, TitleFilter};
pub use user::{ConfirmationPayload, NewUser, Role, User, USERNAME_ATTEMPTS};
