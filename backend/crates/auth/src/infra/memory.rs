//! In-memory user repository
//!
//! Development and test backend. Users are keyed by id with a secondary
//! email index that enforces uniqueness.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::repository::UserRepository;
use crate::domain::user::UserRecord;
use crate::domain::value_object::{email::Email, user_id::UserId};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<DashMap<UserId, UserRecord>>,
    by_email: Arc<DashMap<Email, UserId>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<UserRecord>> {
        let Some(id) = self.by_email.get(email).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<UserRecord>> {
        Ok(self.users.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, user: &UserRecord) -> AuthResult<()> {
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(entry) if entry.get() != &user.id => {
                return Err(AuthError::EmailTaken);
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(entry) => {
                entry.insert(user.id.clone());
            }
        }

        if let Some(previous) = self.users.insert(user.id.clone(), user.clone())
            && previous.email != user.email
        {
            self.by_email.remove(&previous.email);
        }

        Ok(())
    }
}
