use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::session::errors::IdentityError;
use crate::session::errors::PasswordPolicyError;

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Login identity type
///
/// Validates email format using RFC 5322 compliant parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Create a new validated identity.
    ///
    /// # Arguments
    /// * `identity` - Raw email string
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(identity: String) -> Result<Self, IdentityError> {
        email_address::EmailAddress::from_str(&identity)
            .map(|_| Identity(identity))
            .map_err(|e| IdentityError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Plaintext password accepted at registration.
///
/// Only length is enforced; the value never leaves the service unhashed.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    const MIN_LENGTH: usize = 6;
    const MAX_LENGTH: usize = 64;

    /// # Errors
    /// * `TooShort` - Fewer than 6 characters
    /// * `TooLong` - More than 64 characters
    pub fn new(password: String) -> Result<Self, PasswordPolicyError> {
        let length = password.chars().count();
        if length < Self::MIN_LENGTH {
            Err(PasswordPolicyError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(PasswordPolicyError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(password))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Stored credential record owned by the user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: UserId,
    pub identity: Identity,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Credential to insert; the directory assigns id and creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub identity: Identity,
    pub password_hash: String,
}

/// Public view of a registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub id: UserId,
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
}

impl From<&Credential> for UserView {
    fn from(credential: &Credential) -> Self {
        Self {
            id: credential.id,
            identity: credential.identity.clone(),
            created_at: credential.created_at,
        }
    }
}

/// Persisted refresh token, at most one per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: UserId,
    pub token: String,
    pub expiry_date: DateTime<Utc>,
}

impl RefreshToken {
    /// Expiry is exclusive: the token is unusable from `expiry_date` on.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_date
    }
}

/// Refresh token value to write for a user (insert or in-place replace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRefreshToken {
    pub user_id: UserId,
    pub token: String,
    pub expiry_date: DateTime<Utc>,
}

/// Result of inserting a refresh token row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted(RefreshToken),
    /// A row for the user already exists; nothing was written
    AlreadyExists,
}

/// Result of replacing a user's refresh token row in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced(RefreshToken),
    /// No row for the user; nothing was written
    Missing,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in_ms: i64,
}

impl TokenPair {
    pub const TOKEN_TYPE: &'static str = "Bearer";

    pub fn bearer(access_token: String, refresh_token: String, access_ttl: Duration) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: Self::TOKEN_TYPE.to_string(),
            expires_in_ms: access_ttl.num_milliseconds(),
        }
    }
}

/// Resolved identity of the caller for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub identity: Identity,
}

/// Token lifetimes and rotation policy, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub rotate_refresh_tokens: bool,
}

/// Command to register a new user with domain types
#[derive(Debug)]
pub struct RegisterCommand {
    pub identity: Identity,
    pub password: Password,
}

impl RegisterCommand {
    pub fn new(identity: Identity, password: Password) -> Self {
        Self { identity, password }
    }
}
