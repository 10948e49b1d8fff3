use thiserror::Error;

/// Error type for JWT operations.
///
/// `verify` reports every rejection through this type; callers that only
/// care about valid/invalid can treat any `Err` alike.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JwtError {
    #[error("Signing secret too short: minimum {min} bytes, got {actual}")]
    SecretTooShort { min: usize, actual: usize },

    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is expired")]
    TokenExpired,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::Malformed(err.to_string()),
        }
    }
}
