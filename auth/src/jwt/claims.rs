use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Session token claims.
///
/// Timestamps are milliseconds since the Unix epoch, so expiry can be
/// checked below one-second resolution. Access tokens carry the user's
/// identity as `sub`; refresh tokens leave it out and carry a random `jti`
/// instead, so two refresh tokens never collide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (login identity), access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Unique token id, refresh tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Numeric user identifier
    pub id: i64,

    /// Issued at (Unix milliseconds)
    pub iat: i64,

    /// Expiration time (Unix milliseconds)
    pub exp: i64,
}

impl Claims {
    /// Claims for an access token.
    ///
    /// # Arguments
    /// * `user_id` - Numeric user identifier
    /// * `identity` - Login identity, stored as `sub`
    /// * `now` - Issue instant
    /// * `ttl` - Lifetime of the token
    pub fn access(user_id: i64, identity: impl ToString, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: Some(identity.to_string()),
            ..Self::timed(user_id, now, ttl)
        }
    }

    /// Claims for a refresh token (no subject, fresh `jti`).
    pub fn refresh(user_id: i64, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            jti: Some(Uuid::new_v4().to_string()),
            ..Self::timed(user_id, now, ttl)
        }
    }

    fn timed(user_id: i64, now: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = now.timestamp_millis();

        Self {
            sub: None,
            jti: None,
            id: user_id,
            iat,
            exp: iat.saturating_add(ttl.num_milliseconds()),
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref()
    }

    pub fn user_id(&self) -> i64 {
        self.id
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.iat)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.exp)
    }

    /// Check if token is expired.
    ///
    /// Expiry is exclusive: a token is already expired at `exp`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn test_access_claims() {
        let claims = Claims::access(42, "a@b.com", at(1_000), Duration::milliseconds(500));

        assert_eq!(claims.subject(), Some("a@b.com"));
        assert_eq!(claims.user_id(), 42);
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 1_500);
    }

    #[test]
    fn test_refresh_claims_have_no_subject() {
        let claims = Claims::refresh(7, at(0), Duration::days(7));

        assert_eq!(claims.subject(), None);
        assert!(claims.jti.is_some());
        assert_eq!(claims.exp, 7 * 24 * 60 * 60 * 1000);
    }

    #[test]
    fn test_refresh_claims_differ_within_same_instant() {
        let first = Claims::refresh(7, at(0), Duration::days(7));
        let second = Claims::refresh(7, at(0), Duration::days(7));

        assert_ne!(first.jti, second.jti);
        assert_eq!(Claims::access(7, "a@b.com", at(0), Duration::days(7)).jti, None);
    }

    #[test]
    fn test_is_expired() {
        let claims = Claims::refresh(1, at(0), Duration::milliseconds(1000));

        assert!(!claims.is_expired(at(999))); // Not expired
        assert!(claims.is_expired(at(1000))); // Exactly at expiration
        assert!(claims.is_expired(at(1001))); // Expired
    }

    #[test]
    fn test_timestamps_round_trip_to_datetimes() {
        let now = at(1_700_000_000_123);
        let claims = Claims::access(1, "a@b.com", now, Duration::hours(1));

        assert_eq!(claims.issued_at(), Some(now));
        assert_eq!(claims.expires_at(), Some(now + Duration::hours(1)));
    }
}
