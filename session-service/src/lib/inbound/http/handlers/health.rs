use axum::http::StatusCode;

use super::ApiSuccess;

pub async fn health() -> ApiSuccess<()> {
    ApiSuccess::new(StatusCode::OK, "OK", ())
}
