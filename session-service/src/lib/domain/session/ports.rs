use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::session::models::Credential;
use crate::domain::session::models::Identity;
use crate::domain::session::models::NewCredential;
use crate::domain::session::models::NewRefreshToken;
use crate::domain::session::models::Principal;
use crate::domain::session::models::RefreshToken;
use crate::domain::session::models::RegisterCommand;
use crate::domain::session::models::ReplaceOutcome;
use crate::domain::session::models::SaveOutcome;
use crate::domain::session::models::TokenPair;
use crate::domain::session::models::UserId;
use crate::domain::session::models::UserView;
use crate::session::errors::AuthError;

/// Port for authentication domain service operations.
#[async_trait]
pub trait AuthenticationServicePort: Send + Sync + 'static {
    /// Register a new user account.
    ///
    /// # Arguments
    /// * `command` - Validated identity and password
    ///
    /// # Returns
    /// Public view of the created user; no tokens are issued
    ///
    /// # Errors
    /// * `DuplicateIdentity` - Identity is already registered
    /// * `Password` - Hashing failed
    /// * `DatabaseError` - Database operation failed
    async fn register(&self, command: RegisterCommand) -> Result<UserView, AuthError>;

    /// Check credentials and open a session.
    ///
    /// # Arguments
    /// * `identity` - Raw login identity
    /// * `password` - Plaintext password
    ///
    /// # Returns
    /// Fresh access token plus the user's (single) refresh token
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown identity or wrong password
    /// * `DatabaseError` - Database operation failed
    async fn login(&self, identity: &str, password: &str) -> Result<TokenPair, AuthError>;

    /// Exchange a refresh token for a new access token.
    ///
    /// # Arguments
    /// * `refresh_token` - Refresh token value previously returned by login
    ///
    /// # Returns
    /// New access token and the current refresh token value
    ///
    /// # Errors
    /// * `InvalidRefreshToken` - No stored token with this value
    /// * `ExpiredRefreshToken` - Stored token expired; it has been removed
    /// * `UserNotFound` - The owning account no longer exists
    /// * `DatabaseError` - Database operation failed
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    /// Drop the user's refresh token. Idempotent.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn logout(&self, user_id: UserId) -> Result<(), AuthError>;
}

/// Per-request principal resolution.
///
/// Implementations never fail: every problem yields `None`, leaving the
/// request unauthenticated.
#[async_trait]
pub trait RequestAuthenticatorPort: Send + Sync + 'static {
    /// Resolve the caller from the raw `Authorization` header value.
    async fn authenticate(&self, authorization: Option<&str>) -> Option<Principal>;
}

/// Credential lookup and creation, owned by the account store.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Retrieve credential by login identity.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_identity(&self, identity: &Identity) -> Result<Option<Credential>, AuthError>;

    /// Retrieve credential by user identifier.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: UserId) -> Result<Option<Credential>, AuthError>;

    /// Persist a new credential.
    ///
    /// # Returns
    /// Stored credential with assigned id and creation time
    ///
    /// # Errors
    /// * `DuplicateIdentity` - Identity is already registered
    /// * `DatabaseError` - Database operation failed
    async fn insert(&self, credential: NewCredential) -> Result<Credential, AuthError>;
}

/// Persistence for refresh tokens, at most one row per user.
///
/// Every operation touches a single row. The store does not serialize
/// concurrent logins; `save` reports a conflicting row instead of failing.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync + 'static {
    /// Retrieve the row holding this token value.
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, AuthError>;

    /// Retrieve the user's row.
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<RefreshToken>, AuthError>;

    /// Insert a row for `token.user_id`.
    ///
    /// # Returns
    /// `AlreadyExists` if the user already has a row (nothing written)
    async fn save(&self, token: &NewRefreshToken) -> Result<SaveOutcome, AuthError>;

    /// Overwrite the token value and expiry of the user's row in place.
    ///
    /// # Returns
    /// `Missing` if the user has no row (nothing written)
    async fn replace(&self, token: &NewRefreshToken) -> Result<ReplaceOutcome, AuthError>;

    /// Delete the user's row.
    ///
    /// # Returns
    /// Whether a row was deleted
    async fn delete_by_user_id(&self, user_id: UserId) -> Result<bool, AuthError>;
}

/// Source of the current time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
