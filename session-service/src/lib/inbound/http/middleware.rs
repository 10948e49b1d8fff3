use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::session::models::Principal;
use crate::domain::session::ports::RequestAuthenticatorPort;
use crate::inbound::http::router::AppState;

/// Resolve the caller on every request and attach it as a `Principal` extension.
///
/// Never rejects: a missing or bad token just leaves the request anonymous.
/// Any `Principal` already present is dropped first, so only this layer can
/// authenticate a request.
pub async fn authenticate_request(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    req.extensions_mut().remove::<Principal>();

    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let principal = state.request_authenticator.authenticate(authorization).await;

    if let Some(principal) = principal {
        tracing::debug!(user_id = %principal.user_id, "Request authenticated");
        req.extensions_mut().insert(principal);
    }

    next.run(req).await
}

/// Reject requests that `authenticate_request` left anonymous.
pub async fn require_principal(req: Request, next: Next) -> Response {
    if req.extensions().get::<Principal>().is_none() {
        return ApiError::Unauthorized("Authentication required".to_string()).into_response();
    }

    next.run(req).await
}
