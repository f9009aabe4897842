//! Sign Up Use Case
//!
//! Creates a new user account.

use std::sync::Arc;

use platform::password::{ClearTextPassword, PasswordVerifier};

use crate::application::config::AuthConfig;
use crate::domain::claims::Claims;
use crate::domain::repository::UserRepository;
use crate::domain::token_codec::TokenCodec;
use crate::domain::user::UserRecord;
use crate::domain::value_object::{email::Email, island::Island, user_role::UserRole};
use crate::error::{AuthError, AuthResult};

const NAME_MAX_LENGTH: usize = 100;
const CITY_MAX_LENGTH: usize = 100;

/// Sign up input
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// `individual` (default) or `business`
    pub role: Option<String>,
    pub island: Option<String>,
    pub city: Option<String>,
}

/// Sign up output
#[derive(Debug)]
pub struct SignUpOutput {
    pub user: UserRecord,
    /// Present unless the email must be confirmed first
    pub session: Option<(String, Claims)>,
}

impl SignUpOutput {
    pub fn requires_email_confirmation(&self) -> bool {
        self.session.is_none()
    }
}

/// Sign up use case
pub struct SignUpUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    config: Arc<AuthConfig>,
    codec: TokenCodec,
}

impl<U> SignUpUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: Arc<AuthConfig>) -> Self {
        let codec = config.token_codec();
        Self {
            user_repo,
            config,
            codec,
        }
    }

    pub async fn execute(&self, input: SignUpInput) -> AuthResult<SignUpOutput> {
        let email = Email::parse(&input.email)?;
        let first_name = required_name("first_name", &input.first_name)?;
        let last_name = required_name("last_name", &input.last_name)?;

        let role = match input.role.as_deref().map(str::trim) {
            None | Some("") => UserRole::default(),
            Some(code) => code
                .parse::<UserRole>()
                .ok()
                .filter(|role| !role.is_admin())
                .ok_or_else(|| AuthError::InvalidInput("role".to_string()))?,
        };

        let island = match input.island.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(
                name.parse::<Island>()
                    .map_err(|_| AuthError::InvalidInput("island".to_string()))?,
            ),
        };

        let city = match input.city.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(city) if city.chars().count() > CITY_MAX_LENGTH => {
                return Err(AuthError::InvalidInput("city".to_string()));
            }
            Some(city) => Some(city.to_string()),
        };

        // Validate and hash password
        let password = ClearTextPassword::new(input.password)?;

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let mut user = UserRecord::new(
            email,
            PasswordVerifier.hash(&password),
            first_name,
            last_name,
        );
        user.role = role;
        user.island = island;
        user.city = city;
        user.email_verified = !self.config.require_email_verification;

        // Persist; the repository still rejects a concurrent duplicate
        self.user_repo.save(&user).await?;

        tracing::info!(
            user_id = %user.id,
            role = %user.role,
            "User signed up"
        );

        let session = if self.config.require_email_verification {
            None
        } else {
            Some(self.codec.issue_for(&user, false)?)
        };

        Ok(SignUpOutput { user, session })
    }
}

fn required_name(field: &str, raw: &str) -> AuthResult<String> {
    let name = raw.trim();
    if name.is_empty()
        || name.chars().count() > NAME_MAX_LENGTH
        || name.chars().any(char::is_control)
    {
        return Err(AuthError::InvalidInput(field.to_string()));
    }
    Ok(name.to_string())
}
