use std::sync::Arc;

use auth::JwtHandler;
use auth::PasswordHasher;
use axum::Router;

use crate::domain::session::authenticator::RequestAuthenticator;
use crate::domain::session::models::SessionPolicy;
use crate::domain::session::ports::RefreshTokenStore;
use crate::domain::session::ports::UserDirectory;
use crate::domain::session::service::AuthenticationService;
use crate::inbound::http::router::create_router;

/// Wire the domain services over the given storage backends.
///
/// The service and the request authenticator share one `JwtHandler`, so a
/// token issued by login is verified with the same key.
pub fn create_application<UD, RS>(
    users: Arc<UD>,
    refresh_tokens: Arc<RS>,
    jwt_handler: Arc<JwtHandler>,
    password_hasher: PasswordHasher,
    policy: SessionPolicy,
) -> Router
where
    UD: UserDirectory,
    RS: RefreshTokenStore,
{
    let auth_service = Arc::new(AuthenticationService::new(
        Arc::clone(&users),
        refresh_tokens,
        Arc::clone(&jwt_handler),
        password_hasher,
        policy,
    ));
    let request_authenticator = Arc::new(RequestAuthenticator::new(users, jwt_handler));

    create_router(auth_service, request_authenticator)
}
