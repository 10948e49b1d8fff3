use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;

use crate::domain::session::models::NewRefreshToken;
use crate::domain::session::models::RefreshToken;
use crate::domain::session::models::ReplaceOutcome;
use crate::domain::session::models::SaveOutcome;
use crate::domain::session::models::UserId;
use crate::domain::session::ports::RefreshTokenStore;
use crate::session::errors::AuthError;

/// Refresh tokens in the `refresh_tokens` table.
///
/// `UNIQUE (user_id)` keeps one row per user. Inserts use
/// `ON CONFLICT DO NOTHING`, so a lost race surfaces as `AlreadyExists`
/// rather than a failed statement.
pub struct PostgresRefreshTokenStore {
    pool: PgPool,
}

impl PostgresRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: i64,
    user_id: i64,
    token: String,
    expiry_date: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: row.id,
            user_id: UserId(row.user_id),
            token: row.token,
            expiry_date: row.expiry_date,
        }
    }
}

fn database_error(e: sqlx::Error) -> AuthError {
    AuthError::DatabaseError(e.to_string())
}

#[async_trait]
impl RefreshTokenStore for PostgresRefreshTokenStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, AuthError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, user_id, token, expiry_date
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(RefreshToken::from))
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<RefreshToken>, AuthError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, user_id, token, expiry_date
            FROM refresh_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(RefreshToken::from))
    }

    async fn save(&self, token: &NewRefreshToken) -> Result<SaveOutcome, AuthError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            INSERT INTO refresh_tokens (user_id, token, expiry_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, user_id, token, expiry_date
            "#,
        )
        .bind(token.user_id.0)
        .bind(&token.token)
        .bind(token.expiry_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(match row {
            Some(row) => SaveOutcome::Inserted(row.into()),
            None => SaveOutcome::AlreadyExists,
        })
    }

    async fn replace(&self, token: &NewRefreshToken) -> Result<ReplaceOutcome, AuthError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            UPDATE refresh_tokens
            SET token = $2, expiry_date = $3
            WHERE user_id = $1
            RETURNING id, user_id, token, expiry_date
            "#,
        )
        .bind(token.user_id.0)
        .bind(&token.token)
        .bind(token.expiry_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(match row {
            Some(row) => ReplaceOutcome::Replaced(row.into()),
            None => ReplaceOutcome::Missing,
        })
    }

    async fn delete_by_user_id(&self, user_id: UserId) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.0)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected() > 0)
    }
}
