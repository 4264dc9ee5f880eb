pub mod confirmation;
pub mod database;
pub mod email;
pub mod error;
pub mod jwt;
pub mod memory;
pub mod store;

pub use confirmation::{CodeSigner, ConfirmationService, UserLookup};
pub use database::Database;
pub use email::{ConsoleEmailService, EmailProvider, EmailService, MockEmailService};
pub use error::ServiceError;
pub use jwt::{JwtService, TokenPair};
pub use memory::MemoryStore;
pub use store::{CatalogStore, Listing, UserStore, Window};
