//! Check Token Use Case
//!
//! Verifies a bearer token and, when asked, resolves its subject.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::claims::Claims;
use crate::domain::repository::UserRepository;
use crate::domain::token_codec::TokenCodec;
use crate::domain::user::UserRecord;
use crate::domain::value_object::user_id::UserId;
use crate::error::{AuthError, AuthResult};

pub struct CheckTokenUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    codec: TokenCodec,
}

impl<U> CheckTokenUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: Arc<AuthConfig>) -> Self {
        Self {
            user_repo,
            codec: config.token_codec(),
        }
    }

    /// Signature, lifetime and issuer/audience only
    pub fn claims(&self, token: &str) -> AuthResult<Claims> {
        Ok(self.codec.decode(token)?)
    }

    /// Claims plus the current user record
    pub async fn execute(&self, token: &str) -> AuthResult<(Claims, UserRecord)> {
        let claims = self.claims(token)?;
        let user = self
            .user_repo
            .find_by_id(&UserId::from_db(claims.sub.as_str()))
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok((claims, user))
    }
}
