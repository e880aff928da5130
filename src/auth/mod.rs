//! User registration, login and the current session.
//!
//! Credentials live in the persisted state store under the `users` key, the
//! signed-in identity under `currentUser`. Secrets are stored and compared
//! verbatim; see DESIGN.md for the open question on that.


use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, StoreError};
use crate::storage::StateStore;

const USERS_KEY: &str = "users";
const CURRENT_USER_KEY: &str = "currentUser";

/// One registered user, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    pub password_secret: String,
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity of the current user. At most one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    #[serde(rename = "lastLogin")]
    pub login_at: DateTime<Utc>,
}

/// Username to credential-record mapping over the persisted store.
///
/// Pure data access; policy (duplicate rejection, secret comparison) lives
/// in [`SessionAuthenticator`]. The `currentUser` key shares the same
/// backing store, so its persistence also goes through here.
pub struct UserStore {
    store: Box<dyn StateStore>,
}

impl UserStore {
    pub fn new(store: Box<dyn StateStore>) -> Self {
        Self { store }
    }

    fn load_users(&self) -> Result<HashMap<String, UserRecord>, StoreError> {
        match self.store.get(USERS_KEY) {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(HashMap::new()),
        }
    }

    fn save_users(&mut self, users: &HashMap<String, UserRecord>) -> Result<(), StoreError> {
        let json = serde_json::to_string(users)?;
        self.store.set(USERS_KEY, &json)
    }

    /// Look up one user.
    pub fn get(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.load_users()?.remove(username))
    }

    /// Whether a record exists for the username.
    pub fn contains(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.load_users()?.contains_key(username))
    }

    /// Insert a record keyed by its username.
    pub fn insert(&mut self, record: UserRecord) -> Result<(), StoreError> {
        let mut users = self.load_users()?;
        users.insert(record.username.clone(), record);
        self.save_users(&users)
    }

    /// Number of registered users.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.load_users()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn persist_session(&mut self, session: &Session) -> Result<(), StoreError> {
        let json = serde_json::to_string(session)?;
        self.store.set(CURRENT_USER_KEY, &json)
    }

    fn load_session(&self) -> Result<Option<Session>, StoreError> {
        match self.store.get(CURRENT_USER_KEY) {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn clear_session(&mut self) -> Result<(), StoreError> {
        self.store.remove(CURRENT_USER_KEY)
    }
}

/// Validates registration and login against the user store and owns the
/// current session.
pub struct SessionAuthenticator {
    users: UserStore,
    current: Option<Session>,
}

impl SessionAuthenticator {
    pub fn new(store: Box<dyn StateStore>) -> Self {
        Self {
            users: UserStore::new(store),
            current: None,
        }
    }

    /// Register a new user. Does not sign the user in.
    pub fn register(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput);
        }
        if self.users.contains(username)? {
            return Err(AuthError::DuplicateUser(username.to_string()));
        }

        self.users.insert(UserRecord {
            username: username.to_string(),
            password_secret: password.to_string(),
            created_at: Utc::now(),
        })?;
        log::info!("registered user '{}'", username);
        Ok(())
    }

    /// Log in, making the returned session current and persisting it.
    pub fn login(&mut self, username: &str, password: &str) -> Result<Session, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput);
        }

        let record = self
            .users
            .get(username)?
            .ok_or(AuthError::InvalidCredentials)?;
        if record.password_secret != password {
            return Err(AuthError::InvalidCredentials);
        }

        let session = Session {
            username: username.to_string(),
            login_at: Utc::now(),
        };
        self.users.persist_session(&session)?;
        self.current = Some(session.clone());
        log::info!("user '{}' logged in", username);
        Ok(session)
    }

    /// Clear the current session. Always succeeds; capture teardown is the
    /// caller's responsibility.
    pub fn logout(&mut self) {
        if let Some(session) = self.current.take() {
            if let Err(err) = self.users.clear_session() {
                log::warn!("could not clear persisted session: {}", err);
            }
            log::info!("user '{}' logged out", session.username);
        }
    }

    /// Restore a session persisted by an earlier run. Trusts the persisted
    /// state; no lookup against the user records.
    pub fn restore_session(&mut self) -> Option<Session> {
        match self.users.load_session() {
            Ok(Some(session)) => {
                log::info!("restored session for '{}'", session.username);
                self.current = Some(session.clone());
                Some(session)
            }
            Ok(None) => None,
            Err(err) => {
                log::warn!("could not restore persisted session: {}", err);
                None
            }
        }
    }

    /// The current session, if a user is signed in.
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// The underlying user store.
    pub fn users(&self) -> &UserStore {
        &self.users
    }
}
