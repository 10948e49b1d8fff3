use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;

use crate::domain::session::models::Credential;
use crate::domain::session::models::Identity;
use crate::domain::session::models::NewCredential;
use crate::domain::session::models::UserId;
use crate::domain::session::ports::UserDirectory;
use crate::session::errors::AuthError;

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    identity: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = AuthError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        Ok(Credential {
            id: UserId(row.id),
            identity: Identity::new(row.identity)?,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_by_identity(&self, identity: &Identity) -> Result<Option<Credential>, AuthError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, identity, password_hash, created_at
            FROM users
            WHERE identity = $1
            "#,
        )
        .bind(identity.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        row.map(Credential::try_from).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Credential>, AuthError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, identity, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        row.map(Credential::try_from).transpose()
    }

    async fn insert(&self, credential: NewCredential) -> Result<Credential, AuthError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            INSERT INTO users (identity, password_hash)
            VALUES ($1, $2)
            RETURNING id, identity, password_hash, created_at
            "#,
        )
        .bind(credential.identity.as_str())
        .bind(&credential.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some("users_identity_key")
                {
                    return AuthError::DuplicateIdentity(credential.identity.to_string());
                }
            }
            AuthError::DatabaseError(e.to_string())
        })?;

        Credential::try_from(row)
    }
}
