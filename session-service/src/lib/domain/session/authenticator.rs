use std::sync::Arc;

use async_trait::async_trait;
use auth::JwtHandler;

use crate::domain::session::models::Identity;
use crate::domain::session::models::Principal;
use crate::domain::session::models::UserId;
use crate::session::ports::Clock;
use crate::session::ports::RequestAuthenticatorPort;
use crate::session::ports::SystemClock;
use crate::session::ports::UserDirectory;

pub const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization` header value.
///
/// Only the exact `"Bearer "` prefix is accepted.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    authorization
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}

/// Resolves the caller of a request from its bearer access token.
///
/// The token alone is not trusted: the account it names is looked up again,
/// so a deleted user stops authenticating before their token expires.
pub struct RequestAuthenticator<UD>
where
    UD: UserDirectory,
{
    users: Arc<UD>,
    jwt_handler: Arc<JwtHandler>,
    clock: Arc<dyn Clock>,
}

impl<UD> RequestAuthenticator<UD>
where
    UD: UserDirectory,
{
    pub fn new(users: Arc<UD>, jwt_handler: Arc<JwtHandler>) -> Self {
        Self {
            users,
            jwt_handler,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl<UD> RequestAuthenticatorPort for RequestAuthenticator<UD>
where
    UD: UserDirectory,
{
    async fn authenticate(&self, authorization: Option<&str>) -> Option<Principal> {
        let token = bearer_token(authorization?)?;

        let claims = match self.jwt_handler.verify(token, self.clock.now()) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected bearer token");
                return None;
            }
        };

        // Refresh tokens carry no subject and never authenticate a request
        let identity = Identity::new(claims.subject()?.to_string()).ok()?;

        let credential = match self.users.find_by_identity(&identity).await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                tracing::debug!(identity = %identity, "Token subject has no account");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "User lookup failed during authentication");
                return None;
            }
        };

        if credential.id != UserId(claims.user_id()) {
            tracing::warn!(
                token_user_id = claims.user_id(),
                user_id = %credential.id,
                "Token user id does not match account"
            );
            return None;
        }

        Some(Principal {
            user_id: credential.id,
            identity: credential.identity,
        })
    }
}
