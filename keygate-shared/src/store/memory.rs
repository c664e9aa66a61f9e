/// In-memory store implementations
///
/// Back the same contracts as the Postgres stores with process-local maps.
/// Used by the engine's unit tests and for local development without a
/// database; not multi-process safe.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::sessions::{SessionStore, SessionToken};
use super::users::{NewLocalUser, User, UserDirectory};
use super::StoreError;

/// In-memory user directory
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).cloned())
    }

    async fn find_by_federated_id(
        &self,
        federated_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.federated_id.as_deref() == Some(federated_id))
            .cloned())
    }

    async fn is_email_taken(&self, email: &str) -> Result<bool, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.email == email))
    }

    async fn is_username_taken(&self, username: &str) -> Result<bool, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.username == username))
    }

    async fn create_local(&self, user: NewLocalUser) -> Result<Uuid, StoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email".to_string()));
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("username".to_string()));
        }

        let user_id = Uuid::new_v4();
        users.insert(
            user_id,
            User {
                user_id,
                username: user.username,
                email: user.email,
                password_hash: Some(user.password_hash),
                password_salt: Some(user.password_salt),
                federated_id: None,
                current_access_token: None,
                created_at: Utc::now(),
            },
        );

        Ok(user_id)
    }

    async fn create_federated(
        &self,
        email: &str,
        federated_id: &str,
    ) -> Result<Uuid, StoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict("email".to_string()));
        }

        let user_id = Uuid::new_v4();
        users.insert(
            user_id,
            User {
                user_id,
                username: email.to_string(),
                email: email.to_string(),
                password_hash: None,
                password_salt: None,
                federated_id: Some(federated_id.to_string()),
                current_access_token: None,
                created_at: Utc::now(),
            },
        );

        Ok(user_id)
    }

    async fn set_access_token(&self, user_id: Uuid, token: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;

        match users.get_mut(&user_id) {
            Some(user) => {
                user.current_access_token = Some(token.to_string());
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

/// In-memory session store
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionToken>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn count(&self, user_id: Uuid) -> Result<usize, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.values().filter(|s| s.user_id == user_id).count())
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<SessionToken>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, session: SessionToken) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;

        match sessions.remove(token) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    async fn exists(&self, token: &str) -> Result<bool, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.contains_key(token))
    }
}
