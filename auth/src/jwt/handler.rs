use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::errors::JwtError;

/// JWT token handler issuing and verifying session tokens.
///
/// Uses HS256 (HMAC with SHA-256). The key is derived once from the secret
/// and never changes afterwards, so a handler can be shared behind an `Arc`
/// and read concurrently.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
}

impl JwtHandler {
    /// Minimum secret length (256 bits for HS256).
    pub const MIN_SECRET_LENGTH: usize = 32;

    /// Create a new JWT handler with a secret key.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens (should be stored securely)
    ///
    /// # Returns
    /// JwtHandler instance configured with HS256 algorithm
    ///
    /// # Errors
    /// * `SecretTooShort` - Secret is shorter than 32 bytes
    pub fn new(secret: &[u8]) -> Result<Self, JwtError> {
        if secret.len() < Self::MIN_SECRET_LENGTH {
            return Err(JwtError::SecretTooShort {
                min: Self::MIN_SECRET_LENGTH,
                actual: secret.len(),
            });
        }

        let algorithm = Algorithm::HS256;

        let mut validation = Validation::new(algorithm);
        // `exp` is in milliseconds; expiry is checked in `verify`
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            validation,
        })
    }

    /// Encode claims into a signed compact JWT.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        let header = Header::new(self.algorithm);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Issue an access token for `identity`, valid for `ttl` from `now`.
    pub fn issue_access(
        &self,
        user_id: i64,
        identity: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, JwtError> {
        self.encode(&Claims::access(user_id, identity, now, ttl))
    }

    /// Issue a refresh token for `user_id`, valid for `ttl` from `now`.
    ///
    /// Unlike access tokens, each call yields a distinct token.
    pub fn issue_refresh(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, JwtError> {
        self.encode(&Claims::refresh(user_id, now, ttl))
    }

    /// Verify a token's signature and expiry at `now`.
    ///
    /// # Arguments
    /// * `token` - JWT token string to verify
    /// * `now` - Instant the token is checked against
    ///
    /// # Returns
    /// Decoded claims, trusted only because both checks passed
    ///
    /// # Errors
    /// * `Malformed` - Token cannot be decoded
    /// * `InvalidSignature` - Signature does not match
    /// * `TokenExpired` - `now` is at or past `exp`
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;

        if token_data.claims.is_expired(now) {
            return Err(JwtError::TokenExpired);
        }

        Ok(token_data.claims)
    }
}
