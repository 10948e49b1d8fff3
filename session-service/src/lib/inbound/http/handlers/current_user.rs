use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::models::Principal;

/// Echo the principal resolved for this request.
pub async fn current_user(
    Extension(principal): Extension<Principal>,
) -> Result<ApiSuccess<CurrentUserData>, ApiError> {
    Ok(ApiSuccess::new(
        StatusCode::OK,
        "Authenticated user",
        (&principal).into(),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserData {
    pub user_id: i64,
    pub identity: String,
}

impl From<&Principal> for CurrentUserData {
    fn from(principal: &Principal) -> Self {
        Self {
            user_id: principal.user_id.0,
            identity: principal.identity.as_str().to_string(),
        }
    }
}
