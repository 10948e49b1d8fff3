use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::current_user::current_user;
use super::handlers::health::health;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::refresh::refresh;
use super::handlers::register::register;
use super::middleware::authenticate_request;
use super::middleware::require_principal;
use crate::domain::session::ports::AuthenticationServicePort;
use crate::domain::session::ports::RequestAuthenticatorPort;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthenticationServicePort>,
    pub request_authenticator: Arc<dyn RequestAuthenticatorPort>,
}

pub fn create_router(
    auth_service: Arc<dyn AuthenticationServicePort>,
    request_authenticator: Arc<dyn RequestAuthenticatorPort>,
) -> Router {
    let state = AppState {
        auth_service,
        request_authenticator,
    };

    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh));

    let protected_routes = Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/users/me", get(current_user))
        .route_layer(middleware::from_fn(require_principal));

    // Headers are left out of the span; they carry bearer tokens
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate_request,
        ))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
