//! Authenticated session context.
//!
//! An [`AuthSession`] is created once and handed to whoever needs tokens.
//! [`login`](AuthSession::login) initializes it and
//! [`logout`](AuthSession::logout) tears it down; everything in between reads
//! through the backing [`KeyValueStore`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{KeyValueStore, MemoryStore};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_KEY: &str = "user";

/// The logged-in user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub semester: Option<u32>,
    #[serde(default)]
    pub role: Option<u32>,
}

pub struct AuthSession {
    store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl AuthSession {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// A session that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Store the tokens and user returned by a successful login.
    pub fn login(&self, access_token: &str, refresh_token: &str, user: &User) -> Result<(), StoreError> {
        let user_json = serde_json::to_string(user).map_err(|source| StoreError::Value {
            key: USER_KEY.into(),
            source,
        })?;
        self.store.set(ACCESS_TOKEN_KEY, access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, refresh_token)?;
        self.store.set(USER_KEY, &user_json)?;
        tracing::info!(user = %user.username, "session started");
        Ok(())
    }

    /// Forget all session data.
    pub fn logout(&self) -> Result<(), StoreError> {
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)?;
        self.store.remove(USER_KEY)?;
        tracing::info!("session cleared");
        Ok(())
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// Replace the access token after a refresh.
    pub fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(ACCESS_TOKEN_KEY, token)
    }

    /// The stored user. Unreadable user data counts as no user.
    pub fn user(&self) -> Result<Option<User>, StoreError> {
        let Some(raw) = self.store.get(USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "stored user data is unreadable");
                Ok(None)
            }
        }
    }

    /// Whether an access token is present. Storage errors count as logged out.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.access_token(), Ok(Some(_)))
    }
}
