use crate::collection::models::{CollectionStats, MediaItem};
use crate::collection::query::{MediaQuery, Page};
use crate::store::StoreError;
use crate::users::User;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    items: HashMap<Uuid, MediaItem>,
    users: HashMap<String, User>,
}

/// Process-local store; cloned handles share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list_items(&self, query: &MediaQuery) -> Page<MediaItem> {
        let state = self.state.read().await;
        let mut matched: Vec<MediaItem> = state
            .items
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();
        matched.sort_by(|a, b| query.compare(a, b));
        let total = matched.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matched
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .collect();
        Page {
            items,
            total,
            page: query.page,
            page_size: query.page_size,
        }
    }

    pub async fn get_item(&self, id: Uuid) -> Option<MediaItem> {
        self.state.read().await.items.get(&id).cloned()
    }

    pub async fn insert_item(&self, item: &MediaItem) {
        self.state
            .write()
            .await
            .items
            .insert(item.id, item.clone());
    }

    pub async fn update_item(&self, item: &MediaItem) -> bool {
        let mut state = self.state.write().await;
        match state.items.get_mut(&item.id) {
            Some(slot) => {
                *slot = item.clone();
                true
            }
            None => false,
        }
    }

    pub async fn delete_item(&self, id: Uuid) -> bool {
        self.state.write().await.items.remove(&id).is_some()
    }

    pub async fn owned_stats(&self) -> CollectionStats {
        let state = self.state.read().await;
        CollectionStats::from_items(state.items.values())
    }

    /// Distinct non-empty values of one text column, ascending.
    pub async fn distinct(&self, column: impl Fn(&MediaItem) -> Option<&str>) -> Vec<String> {
        let state = self.state.read().await;
        state
            .items
            .values()
            .filter_map(|item| column(item))
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.username) {
            return Err(StoreError::DuplicateUsername);
        }
        state.users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    pub async fn find_user(&self, username: &str) -> Option<User> {
        self.state.read().await.users.get(username).cloned()
    }

    pub async fn list_users(&self) -> Vec<User> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }
}
