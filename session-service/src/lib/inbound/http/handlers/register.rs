use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::models::Identity;
use crate::domain::session::models::Password;
use crate::domain::session::models::RegisterCommand;
use crate::domain::session::models::UserView;
use crate::inbound::http::router::AppState;
use crate::session::errors::IdentityError;
use crate::session::errors::PasswordPolicyError;

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiSuccess<RegisterResponseData>, ApiError> {
    let Json(body) = payload?;

    state
        .auth_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref user| {
            ApiSuccess::new(StatusCode::CREATED, "User registered successfully", user.into())
        })
}

/// HTTP request body for registration (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    #[serde(alias = "email")]
    identity: String,
    password: String,
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterRequestError {
    #[error("Invalid identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("Invalid password: {0}")]
    Password(#[from] PasswordPolicyError),
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterCommand, ParseRegisterRequestError> {
        let identity = Identity::new(self.identity)?;
        let password = Password::new(self.password)?;
        Ok(RegisterCommand::new(identity, password))
    }
}

impl From<ParseRegisterRequestError> for ApiError {
    fn from(err: ParseRegisterRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponseData {
    pub id: i64,
    pub identity: String,
    pub created_at: DateTime<Utc>,
}

impl From<&UserView> for RegisterResponseData {
    fn from(user: &UserView) -> Self {
        Self {
            id: user.id.0,
            identity: user.identity.as_str().to_string(),
            created_at: user.created_at,
        }
    }
}
