//! Persistence for collection items and user accounts.
//!
//! `DATABASE_URL` selects Postgres (migrations run on connect); without it the
//! service falls back to a process-local store so it can run unconfigured.

pub mod memory;
pub mod postgres;

use crate::collection::models::{CollectionStats, EnumCasing, MediaItem};
use crate::collection::query::{MediaQuery, Page};
use crate::error::ServiceError;
use crate::users::User;
use memory::MemoryStore;
use postgres::PgStore;
use sqlx::postgres::PgPoolOptions;
use std::env;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("username already exists")]
    DuplicateUsername,
    #[error("stored row is invalid: {0}")]
    Corrupt(String),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateUsername => {
                ServiceError::conflict("users", "Username already exists.")
            }
            other => ServiceError::internal("store", other.to_string()),
        }
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Postgres(PgStore),
}

impl Store {
    pub async fn from_env(casing: EnumCasing) -> Result<Self, StoreError> {
        let Some(url) = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()) else {
            warn!(
                target = "media.store",
                "DATABASE_URL not set; using in-memory store, data is lost on restart"
            );
            return Ok(Store::Memory(MemoryStore::new()));
        };
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(
            target = "media.store",
            max_connections = max_connections,
            casing = ?casing,
            "postgres_store_ready"
        );
        Ok(Store::Postgres(PgStore::new(pool, casing)))
    }

    pub fn memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    pub async fn list_items(&self, query: &MediaQuery) -> Result<Page<MediaItem>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.list_items(query).await),
            Store::Postgres(store) => store.list_items(query).await,
        }
    }

    pub async fn get_item(&self, id: Uuid) -> Result<Option<MediaItem>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.get_item(id).await),
            Store::Postgres(store) => store.get_item(id).await,
        }
    }

    pub async fn insert_item(&self, item: &MediaItem) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => {
                store.insert_item(item).await;
                Ok(())
            }
            Store::Postgres(store) => store.insert_item(item).await,
        }
    }

    /// Replaces the stored row; `false` when no row has this id.
    pub async fn update_item(&self, item: &MediaItem) -> Result<bool, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.update_item(item).await),
            Store::Postgres(store) => store.update_item(item).await,
        }
    }

    pub async fn delete_item(&self, id: Uuid) -> Result<bool, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.delete_item(id).await),
            Store::Postgres(store) => store.delete_item(id).await,
        }
    }

    pub async fn owned_stats(&self) -> Result<CollectionStats, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.owned_stats().await),
            Store::Postgres(store) => store.owned_stats().await,
        }
    }

    pub async fn distinct_platforms(&self) -> Result<Vec<String>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.distinct(|item| item.platform.as_deref()).await),
            Store::Postgres(store) => store.distinct("platform").await,
        }
    }

    pub async fn distinct_genres(&self) -> Result<Vec<String>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.distinct(|item| item.genre.as_deref()).await),
            Store::Postgres(store) => store.distinct("genre").await,
        }
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.insert_user(user).await,
            Store::Postgres(store) => store.insert_user(user).await,
        }
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.find_user(username).await),
            Store::Postgres(store) => store.find_user(username).await,
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.list_users().await),
            Store::Postgres(store) => store.list_users().await,
        }
    }
}
