use std::sync::Arc;

use async_trait::async_trait;
use auth::JwtHandler;
use auth::PasswordHasher;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::session::models::Identity;
use crate::domain::session::models::NewCredential;
use crate::domain::session::models::NewRefreshToken;
use crate::domain::session::models::RefreshToken;
use crate::domain::session::models::RegisterCommand;
use crate::domain::session::models::ReplaceOutcome;
use crate::domain::session::models::SaveOutcome;
use crate::domain::session::models::SessionPolicy;
use crate::domain::session::models::TokenPair;
use crate::domain::session::models::UserId;
use crate::domain::session::models::UserView;
use crate::session::errors::AuthError;
use crate::session::ports::AuthenticationServicePort;
use crate::session::ports::Clock;
use crate::session::ports::RefreshTokenStore;
use crate::session::ports::SystemClock;
use crate::session::ports::UserDirectory;

/// Bound on save/replace alternations while concurrent logins race for one user.
const MAX_PERSIST_ATTEMPTS: usize = 4;

/// Domain service implementation for registration, login and refresh.
///
/// Holds no session state of its own; the refresh token store is the only
/// thing written besides the user directory. Each call performs at most one
/// storage write, so a call either fully lands or has no effect.
pub struct AuthenticationService<UD, RS>
where
    UD: UserDirectory,
    RS: RefreshTokenStore,
{
    users: Arc<UD>,
    refresh_tokens: Arc<RS>,
    jwt_handler: Arc<JwtHandler>,
    password_hasher: PasswordHasher,
    policy: SessionPolicy,
    clock: Arc<dyn Clock>,
}

impl<UD, RS> AuthenticationService<UD, RS>
where
    UD: UserDirectory,
    RS: RefreshTokenStore,
{
    /// Create a new authentication service with injected dependencies.
    ///
    /// # Arguments
    /// * `users` - Credential lookup and creation
    /// * `refresh_tokens` - Refresh token persistence
    /// * `jwt_handler` - Token codec sharing the process-wide signing key
    /// * `password_hasher` - Credential hashing at the configured cost
    /// * `policy` - Token lifetimes and rotation policy
    pub fn new(
        users: Arc<UD>,
        refresh_tokens: Arc<RS>,
        jwt_handler: Arc<JwtHandler>,
        password_hasher: PasswordHasher,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            jwt_handler,
            password_hasher,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock, e.g. to pin time in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn new_refresh_token(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<NewRefreshToken, AuthError> {
        let token = self
            .jwt_handler
            .issue_refresh(user_id.0, now, self.policy.refresh_ttl)?;

        Ok(NewRefreshToken {
            user_id,
            token,
            expiry_date: now + self.policy.refresh_ttl,
        })
    }

    /// Store `token` as the user's single refresh token.
    ///
    /// Replaces an existing row, inserts otherwise. A concurrent login can
    /// insert between our lookup and our insert (`AlreadyExists`), or a
    /// concurrent expiry can delete the row we meant to replace (`Missing`);
    /// both switch to the other write.
    async fn persist_refresh_token(
        &self,
        token: &NewRefreshToken,
    ) -> Result<RefreshToken, AuthError> {
        let mut exists = self
            .refresh_tokens
            .find_by_user_id(token.user_id)
            .await?
            .is_some();

        for _ in 0..MAX_PERSIST_ATTEMPTS {
            if exists {
                match self.refresh_tokens.replace(token).await? {
                    ReplaceOutcome::Replaced(row) => return Ok(row),
                    ReplaceOutcome::Missing => exists = false,
                }
            } else {
                match self.refresh_tokens.save(token).await? {
                    SaveOutcome::Inserted(row) => return Ok(row),
                    SaveOutcome::AlreadyExists => {
                        tracing::debug!(
                            user_id = %token.user_id,
                            "Concurrent login stored a refresh token first; replacing it"
                        );
                        exists = true;
                    }
                }
            }
        }

        Err(AuthError::Unknown(format!(
            "Refresh token for user {} kept changing under concurrent writes",
            token.user_id
        )))
    }
}

#[async_trait]
impl<UD, RS> AuthenticationServicePort for AuthenticationService<UD, RS>
where
    UD: UserDirectory,
    RS: RefreshTokenStore,
{
    async fn register(&self, command: RegisterCommand) -> Result<UserView, AuthError> {
        if self
            .users
            .find_by_identity(&command.identity)
            .await?
            .is_some()
        {
            return Err(AuthError::DuplicateIdentity(command.identity.to_string()));
        }

        let password_hash = self.password_hasher.hash(command.password.as_str())?;

        let created = self
            .users
            .insert(NewCredential {
                identity: command.identity,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %created.id, "User registered");

        Ok(UserView::from(&created))
    }

    async fn login(&self, identity: &str, password: &str) -> Result<TokenPair, AuthError> {
        // A malformed identity cannot exist; answer exactly like an unknown one
        let identity =
            Identity::new(identity.to_string()).map_err(|_| AuthError::InvalidCredentials)?;

        let credential = match self.users.find_by_identity(&identity).await? {
            Some(credential)
                if self
                    .password_hasher
                    .matches(password, &credential.password_hash) =>
            {
                credential
            }
            _ => return Err(AuthError::InvalidCredentials),
        };

        let now = self.clock.now();
        let access_token = self.jwt_handler.issue_access(
            credential.id.0,
            credential.identity.as_str(),
            now,
            self.policy.access_ttl,
        )?;
        let refresh_token = self.new_refresh_token(credential.id, now)?;

        let stored = self.persist_refresh_token(&refresh_token).await?;

        tracing::info!(user_id = %credential.id, "User logged in");

        Ok(TokenPair::bearer(
            access_token,
            stored.token,
            self.policy.access_ttl,
        ))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let stored = self
            .refresh_tokens
            .find_by_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let now = self.clock.now();
        if stored.is_expired(now) {
            self.refresh_tokens
                .delete_by_user_id(stored.user_id)
                .await?;
            tracing::warn!(
                user_id = %stored.user_id,
                "Expired refresh token presented; stored token removed"
            );
            return Err(AuthError::ExpiredRefreshToken);
        }

        // Resolve the owner through the row's user id, never its row id
        let user = self
            .users
            .find_by_id(stored.user_id)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(stored.user_id.to_string()))?;

        let access_token = self.jwt_handler.issue_access(
            user.id.0,
            user.identity.as_str(),
            now,
            self.policy.access_ttl,
        )?;

        let refresh_token = if self.policy.rotate_refresh_tokens {
            let rotated = self.new_refresh_token(user.id, now)?;
            // Rotation only overwrites; a row removed by a concurrent logout stays removed
            match self.refresh_tokens.replace(&rotated).await? {
                ReplaceOutcome::Replaced(row) => row.token,
                ReplaceOutcome::Missing => return Err(AuthError::InvalidRefreshToken),
            }
        } else {
            stored.token
        };

        tracing::info!(
            user_id = %user.id,
            rotated = self.policy.rotate_refresh_tokens,
            "Access token refreshed"
        );

        Ok(TokenPair::bearer(
            access_token,
            refresh_token,
            self.policy.access_ttl,
        ))
    }

    async fn logout(&self, user_id: UserId) -> Result<(), AuthError> {
        let removed = self.refresh_tokens.delete_by_user_id(user_id).await?;
        tracing::info!(user_id = %user_id, removed, "User logged out");
        Ok(())
    }
}
