//! User registration and credential checks.

use crate::error::ServiceError;
use crate::store::{Store, StoreError};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 8;
const SALT_BYTES: usize = 16;

/// Verified against when the username is unknown so both login failures cost one Argon2 run.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| {
    let salt = SaltString::encode_b64(&[0x5a; SALT_BYTES]).ok()?;
    Argon2::default()
        .hash_password(b"no-such-user", &salt)
        .ok()
        .map(|hash| hash.to_string())
});

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// PHC string; the salt travels inside it.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("username must be between 3 and 50 characters")]
    InvalidUsername,
    #[error("password must be at least 8 characters")]
    WeakPassword,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<UserError> for ServiceError {
    fn from(value: UserError) -> Self {
        match value {
            UserError::InvalidUsername => ServiceError::invalid_argument(
                "users",
                "Username must be between 3 and 50 characters.",
            ),
            UserError::WeakPassword => ServiceError::invalid_argument(
                "users",
                "Password must be at least 8 characters.",
            ),
            UserError::InvalidCredentials => {
                ServiceError::unauthorized("users", "Invalid username or password.")
            }
            UserError::Hash(msg) => ServiceError::internal("users", msg),
            UserError::Store(err) => err.into(),
        }
    }
}

async fn hash_password(password: String) -> Result<String, UserError> {
    tokio::task::spawn_blocking(move || {
        let salt_bytes = rand::random::<[u8; SALT_BYTES]>();
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|err| UserError::Hash(err.to_string()))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| UserError::Hash(err.to_string()))
    })
    .await
    .map_err(|err| UserError::Hash(err.to_string()))?
}

async fn verify_password(password: String, stored: String) -> Result<bool, UserError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored).map_err(|err| UserError::Hash(err.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|err| UserError::Hash(err.to_string()))?
}

async fn verify_dummy(password: String) -> Result<(), UserError> {
    tokio::task::spawn_blocking(move || {
        if let Some(parsed) = DUMMY_HASH
            .as_deref()
            .and_then(|hash| PasswordHash::new(hash).ok())
        {
            let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
        }
    })
    .await
    .map_err(|err| UserError::Hash(err.to_string()))
}

#[derive(Clone)]
pub struct UserService {
    store: Store,
}

impl UserService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn register(&self, credentials: Credentials) -> Result<UserDto, UserError> {
        let username = credentials.username.trim().to_string();
        let length = username.chars().count();
        if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&length) {
            return Err(UserError::InvalidUsername);
        }
        if credentials.password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(UserError::WeakPassword);
        }

        let user = User {
            id: Uuid::new_v4(),
            username,
            password_hash: hash_password(credentials.password).await?,
            created_at: Utc::now(),
        };
        self.store.insert_user(&user).await?;
        info!(target = "media.users", user_id = %user.id, "user_registered");
        Ok(user.into())
    }

    /// Unknown users and wrong passwords fail identically.
    pub async fn login(&self, credentials: Credentials) -> Result<UserDto, UserError> {
        let username = credentials.username.trim();
        let Some(user) = self.store.find_user(username).await? else {
            verify_dummy(credentials.password).await?;
            warn!(target = "media.users", "login_unknown_user");
            return Err(UserError::InvalidCredentials);
        };
        if !verify_password(credentials.password, user.password_hash.clone()).await? {
            warn!(target = "media.users", user_id = %user.id, "login_bad_password");
            return Err(UserError::InvalidCredentials);
        }
        info!(target = "media.users", user_id = %user.id, "login_succeeded");
        Ok(user.into())
    }

    pub async fn list(&self) -> Result<Vec<UserDto>, UserError> {
        let users = self.store.list_users().await?;
        Ok(users.into_iter().map(UserDto::from).collect())
    }
}
