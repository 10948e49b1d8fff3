use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::models::TokenPair;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiSuccess<TokenPairData>, ApiError> {
    let Json(body) = payload?;

    state
        .auth_service
        .login(&body.identity, &body.password)
        .await
        .map_err(ApiError::from)
        .map(|pair| ApiSuccess::new(StatusCode::OK, "Login successful", pair.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    identity: String,
    password: String,
}

/// Token pair as returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairData {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in_ms: i64,
}

impl From<TokenPair> for TokenPairData {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            expires_in_ms: pair.expires_in_ms,
        }
    }
}
