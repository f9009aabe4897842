//! Repository Traits
//!
//! Interfaces for user persistence. Implementations live in the infra layer.

use crate::domain::user::UserRecord;
use crate::domain::value_object::{email::Email, user_id::UserId};
use crate::error::AuthResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Find user by (normalized) email
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<UserRecord>>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<UserRecord>>;

    /// Insert or replace a user
    ///
    /// Fails with `EmailTaken` when another account already owns the email.
    async fn save(&self, user: &UserRecord) -> AuthResult<()>;
}
