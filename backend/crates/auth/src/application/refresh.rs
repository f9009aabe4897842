//! Refresh Token Use Case

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::claims::Claims;
use crate::domain::repository::UserRepository;
use crate::domain::token_codec::TokenCodec;
use crate::domain::value_object::user_id::UserId;
use crate::error::{AuthError, AuthResult};

pub struct RefreshOutput {
    pub token: String,
    pub claims: Claims,
}

/// Re-issues a still-valid token, refusing subjects that were deleted or locked
pub struct RefreshTokenUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    codec: TokenCodec,
}

impl<U> RefreshTokenUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: Arc<AuthConfig>) -> Self {
        Self {
            user_repo,
            codec: config.token_codec(),
        }
    }

    pub async fn execute(&self, token: &str, extend_expiration: bool) -> AuthResult<RefreshOutput> {
        let claims = self.codec.decode(token)?;

        let user = self
            .user_repo
            .find_by_id(&UserId::from_db(claims.sub.as_str()))
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if user.is_locked() {
            return Err(AuthError::AccountLocked);
        }

        let (token, claims) = self.codec.refresh(token, extend_expiration)?;

        tracing::debug!(
            user_id = %user.id,
            extended = extend_expiration,
            "Token refreshed"
        );

        Ok(RefreshOutput { token, claims })
    }
}
