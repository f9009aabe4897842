//! Sign In Use Case
//!
//! Verifies credentials and issues a session token.

use std::sync::{Arc, LazyLock};

use platform::password::{ClearTextPassword, PasswordError, PasswordVerifier, StoredPasswordHash};

use crate::application::config::AuthConfig;
use crate::domain::claims::Claims;
use crate::domain::repository::UserRepository;
use crate::domain::token_codec::TokenCodec;
use crate::domain::user::UserRecord;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

/// Verified against when the email is unknown, so both paths cost one derivation
static DUMMY_HASH: LazyLock<StoredPasswordHash> = LazyLock::new(|| {
    PasswordVerifier.hash(&ClearTextPassword::for_login(
        "dummy-password-for-timing".to_string(),
    ))
});

/// Sign in input
pub struct SignInInput {
    pub email: String,
    pub password: String,
    /// Long-lived token
    pub remember_me: bool,
}

/// Sign in output
#[derive(Debug)]
pub struct SignInOutput {
    pub token: String,
    pub claims: Claims,
    pub user: UserRecord,
}

/// Sign in use case
pub struct SignInUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    config: Arc<AuthConfig>,
    codec: TokenCodec,
    verifier: PasswordVerifier,
}

impl<U> SignInUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: Arc<AuthConfig>) -> Self {
        let codec = config.token_codec();
        Self {
            user_repo,
            config,
            codec,
            verifier: PasswordVerifier,
        }
    }

    /// ## Returns
    /// `InvalidCredentials` for any unknown email, wrong password or unreadable
    /// hash. `AccountLocked` and `EmailNotVerified` are only reported once the
    /// password has been proven.
    pub async fn execute(&self, input: SignInInput) -> AuthResult<SignInOutput> {
        let password = ClearTextPassword::for_login(input.password);

        let Ok(email) = Email::parse(&input.email) else {
            let _ = self.verifier.verify(&password, &DUMMY_HASH);
            return Err(AuthError::InvalidCredentials);
        };

        let Some(mut user) = self.user_repo.find_by_email(&email).await? else {
            let _ = self.verifier.verify(&password, &DUMMY_HASH);
            return Err(AuthError::InvalidCredentials);
        };

        if let Err(err) = self.verifier.verify_detailed(&password, &user.password_hash) {
            if err == PasswordError::FormatUnsupported {
                tracing::warn!(
                    user_id = %user.id,
                    format = user.password_hash.format().as_str(),
                    "Stored password hash could not be read"
                );
            }
            user.record_failure();
            self.user_repo.save(&user).await?;
            tracing::debug!(
                user_id = %user.id,
                failed_attempts = user.failed_login_attempts,
                "Password rejected"
            );
            return Err(AuthError::InvalidCredentials);
        }

        if user.is_locked() {
            return Err(AuthError::AccountLocked);
        }

        if self.config.require_email_verification && !user.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        let mut dirty = false;
        if user.failed_login_attempts > 0 {
            user.reset_failures();
            dirty = true;
        }
        if self.config.rehash_legacy_on_login && self.verifier.needs_rehash(&user.password_hash) {
            user.password_hash = self.verifier.hash(&password);
            dirty = true;
            tracing::info!(user_id = %user.id, "Password hash upgraded");
        }
        if dirty {
            self.user_repo.save(&user).await?;
        }

        let (token, claims) = self.codec.issue_for(&user, input.remember_me)?;

        tracing::info!(
            user_id = %user.id,
            remember_me = input.remember_me,
            "User signed in"
        );

        Ok(SignInOutput {
            token,
            claims,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::MAX_FAILED_ATTEMPTS;
    use crate::infra::memory::InMemoryUserRepository;
    use platform::password::{HashFormat, PasswordEnvelope};

    async fn setup(
        config: AuthConfig,
    ) -> (
        SignInUseCase<InMemoryUserRepository>,
        Arc<InMemoryUserRepository>,
        UserRecord,
    ) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let hash = PasswordVerifier.hash(&ClearTextPassword::for_login("Secret123".to_string()));
        let user = UserRecord::new(Email::from_db("ana@example.com"), hash, "Ana", "Pérez");
        repo.save(&user).await.unwrap();

        let use_case = SignInUseCase::new(repo.clone(), Arc::new(config));
        (use_case, repo, user)
    }

    fn input(password: &str) -> SignInInput {
        SignInInput {
            email: "Ana@Example.com".to_string(),
            password: password.to_string(),
            remember_me: false,
        }
    }

    #[tokio::test]
    async fn test_sign_in_success() {
        let (use_case, _, user) = setup(AuthConfig::development()).await;

        let output = use_case.execute(input("Secret123")).await.unwrap();

        assert_eq!(output.user.id, user.id);
        assert_eq!(output.claims.sub, user.id.as_str());
        assert_eq!(output.claims.email.as_deref(), Some("ana@example.com"));
        assert!(!output.claims.remember_me);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_alike() {
        let (use_case, _, _) = setup(AuthConfig::development()).await;

        let wrong = use_case.execute(input("secret123")).await.unwrap_err();
        let unknown = use_case
            .execute(SignInInput {
                email: "nobody@example.com".to_string(),
                password: "Secret123".to_string(),
                remember_me: false,
            })
            .await
            .unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_lockout_after_repeated_failures() {
        let (use_case, repo, user) = setup(AuthConfig::development()).await;

        for _ in 0..MAX_FAILED_ATTEMPTS {
            let _ = use_case.execute(input("wrong-password")).await;
        }

        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.is_locked());

        let err = use_case.execute(input("Secret123")).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));

        let err = use_case.execute(input("wrong-password")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_success_resets_failures() {
        let (use_case, repo, user) = setup(AuthConfig::development()).await;

        let _ = use_case.execute(input("nope-nope")).await;
        use_case.execute(input("Secret123")).await.unwrap();

        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.failed_login_attempts, 0);
    }

    #[tokio::test]
    async fn test_email_verification_required() {
        let config = AuthConfig {
            require_email_verification: true,
            ..AuthConfig::development()
        };
        let (use_case, _, _) = setup(config).await;

        let err = use_case.execute(input("Secret123")).await.unwrap_err();
        assert!(matches!(err, AuthError::EmailNotVerified));

        let err = use_case.execute(input("wrong-one")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unreadable_hash_is_invalid_credentials() {
        let (use_case, repo, mut user) = setup(AuthConfig::development()).await;
        user.password_hash = StoredPasswordHash::with_format("garbage", HashFormat::Phc);
        repo.save(&user).await.unwrap();

        let err = use_case.execute(input("Secret123")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_sign_in_with_bcrypt_hash() {
        let (use_case, repo, mut user) = setup(AuthConfig::development()).await;
        user.password_hash = StoredPasswordHash::classify(
            "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW",
        );
        repo.save(&user).await.unwrap();

        let output = use_case.execute(input("U*U")).await.unwrap();
        assert_eq!(output.user.id, user.id);

        let err = use_case.execute(input("U*V")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        // Kept as bcrypt until rehashing is enabled
        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash.format(), HashFormat::Bcrypt);
    }

    #[tokio::test]
    async fn test_legacy_hash_kept_unless_enabled() {
        let (use_case, repo, mut user) = setup(AuthConfig::development()).await;
        let password = ClearTextPassword::for_login("Secret123".to_string());
        let legacy = PasswordEnvelope::derive(&password, 1_000).encode();
        user.password_hash = StoredPasswordHash::classify(legacy.clone());
        repo.save(&user).await.unwrap();

        use_case.execute(input("Secret123")).await.unwrap();
        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash.as_str(), legacy);

        let config = AuthConfig {
            rehash_legacy_on_login: true,
            ..AuthConfig::development()
        };
        let upgrading = SignInUseCase::new(repo.clone(), Arc::new(config));
        upgrading.execute(input("Secret123")).await.unwrap();

        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash.as_str(), legacy);
        assert!(!PasswordVerifier.needs_rehash(&stored.password_hash));
        assert!(PasswordVerifier.verify(&password, &stored.password_hash));
    }
}
