//! Process-local storage backends.
//!
//! Selected with `database.backend = "memory"`; contents are lost on restart.
//! Each store guards its map with a single `tokio::sync::RwLock`, so every
//! operation is atomic with respect to the others.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::session::models::Credential;
use crate::domain::session::models::Identity;
use crate::domain::session::models::NewCredential;
use crate::domain::session::models::NewRefreshToken;
use crate::domain::session::models::RefreshToken;
use crate::domain::session::models::ReplaceOutcome;
use crate::domain::session::models::SaveOutcome;
use crate::domain::session::models::UserId;
use crate::domain::session::ports::RefreshTokenStore;
use crate::domain::session::ports::UserDirectory;
use crate::session::errors::AuthError;

#[derive(Default)]
struct Users {
    next_id: i64,
    by_id: HashMap<UserId, Credential>,
    by_identity: HashMap<Identity, UserId>,
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Users>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_identity(&self, identity: &Identity) -> Result<Option<Credential>, AuthError> {
        let guard = self.users.read().await;
        Ok(guard
            .by_identity
            .get(identity)
            .and_then(|id| guard.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Credential>, AuthError> {
        Ok(self.users.read().await.by_id.get(&id).cloned())
    }

    async fn insert(&self, credential: NewCredential) -> Result<Credential, AuthError> {
        let mut guard = self.users.write().await;
        if guard.by_identity.contains_key(&credential.identity) {
            return Err(AuthError::DuplicateIdentity(credential.identity.to_string()));
        }

        guard.next_id += 1;
        let stored = Credential {
            id: UserId(guard.next_id),
            identity: credential.identity,
            password_hash: credential.password_hash,
            created_at: Utc::now(),
        };

        guard.by_identity.insert(stored.identity.clone(), stored.id);
        guard.by_id.insert(stored.id, stored.clone());

        Ok(stored)
    }
}

#[derive(Default)]
struct Tokens {
    next_id: i64,
    by_user: HashMap<UserId, RefreshToken>,
    /// Token value to owner; kept in step with `by_user`
    by_token: HashMap<String, UserId>,
}

#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: RwLock<Tokens>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.by_user.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, AuthError> {
        let guard = self.tokens.read().await;
        Ok(guard
            .by_token
            .get(token)
            .and_then(|user_id| guard.by_user.get(user_id))
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<RefreshToken>, AuthError> {
        Ok(self.tokens.read().await.by_user.get(&user_id).cloned())
    }

    async fn save(&self, token: &NewRefreshToken) -> Result<SaveOutcome, AuthError> {
        let mut guard = self.tokens.write().await;
        if guard.by_user.contains_key(&token.user_id) {
            return Ok(SaveOutcome::AlreadyExists);
        }

        guard.next_id += 1;
        let row = RefreshToken {
            id: guard.next_id,
            user_id: token.user_id,
            token: token.token.clone(),
            expiry_date: token.expiry_date,
        };
        guard.by_token.insert(row.token.clone(), row.user_id);
        guard.by_user.insert(row.user_id, row.clone());

        Ok(SaveOutcome::Inserted(row))
    }

    async fn replace(&self, token: &NewRefreshToken) -> Result<ReplaceOutcome, AuthError> {
        let mut guard = self.tokens.write().await;
        let Tokens {
            by_user, by_token, ..
        } = &mut *guard;

        Ok(match by_user.get_mut(&token.user_id) {
            Some(row) => {
                by_token.remove(&row.token);
                by_token.insert(token.token.clone(), row.user_id);
                row.token = token.token.clone();
                row.expiry_date = token.expiry_date;
                ReplaceOutcome::Replaced(row.clone())
            }
            None => ReplaceOutcome::Missing,
        })
    }

    async fn delete_by_user_id(&self, user_id: UserId) -> Result<bool, AuthError> {
        let mut guard = self.tokens.write().await;
        match guard.by_user.remove(&user_id) {
            Some(row) => {
                guard.by_token.remove(&row.token);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
