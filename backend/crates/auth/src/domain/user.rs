//! User Record
//!
//! Account data the auth path needs, built once by the repository.

use platform::password::StoredPasswordHash;

use crate::domain::value_object::{
    email::Email, island::Island, user_id::UserId, user_role::UserRole,
};

/// Failed sign-ins before the account counts as locked
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: Email,
    pub password_hash: StoredPasswordHash,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub island: Option<Island>,
    pub city: Option<String>,
    pub email_verified: bool,
    /// Administrative lock, independent of failed attempts
    pub locked: bool,
    pub failed_login_attempts: u32,
}

impl UserRecord {
    /// New, unverified account with a generated id
    pub fn new(
        email: Email,
        password_hash: StoredPasswordHash,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::generate(),
            email,
            password_hash,
            first_name: first_name.into(),
            last_name: last_name.into(),
            role: UserRole::default(),
            island: None,
            city: None,
            email_verified: false,
            locked: false,
            failed_login_attempts: 0,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked || self.failed_login_attempts >= MAX_FAILED_ATTEMPTS
    }

    pub fn record_failure(&mut self) {
        self.failed_login_attempts = self.failed_login_attempts.saturating_add(1);
    }

    pub fn reset_failures(&mut self) {
        self.failed_login_attempts = 0;
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserRecord {
        UserRecord::new(
            Email::from_db("ana@example.com"),
            StoredPasswordHash::classify("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"),
            "Ana",
            "Pérez",
        )
    }

    #[test]
    fn test_lockout_after_failures() {
        let mut user = user();
        for _ in 0..MAX_FAILED_ATTEMPTS - 1 {
            user.record_failure();
        }
        assert!(!user.is_locked());

        user.record_failure();
        assert!(user.is_locked());

        user.reset_failures();
        assert!(!user.is_locked());
    }

    #[test]
    fn test_admin_lock() {
        let mut user = user();
        user.locked = true;
        assert!(user.is_locked());
    }

    #[test]
    fn test_debug_hides_hash() {
        let debug = format!("{:?}", user());
        assert!(!debug.contains("argon2id"));
    }
}
