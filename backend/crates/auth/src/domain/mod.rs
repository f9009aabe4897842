//! Domain Layer
//!
//! Contains the user record, token codec, value objects and repository traits.

pub mod claims;
pub mod repository;
pub mod token_codec;
pub mod user;
pub mod value_object;

// Re-exports
pub use claims::Claims;
pub use repository::{LocalUserRepository, UserRepository};
pub use token_codec::{TokenCodec, TokenError, TokenResult};
pub use user::UserRecord;
