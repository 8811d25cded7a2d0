//! Authoritative storage for markers and categories.
//!
//! The router talks to a [`MapStore`] trait object so the in-memory and
//! SQLite backends are interchangeable at startup.

mod memory;
mod sqlite;

use async_trait::async_trait;
use std::sync::Arc;

use crate::types::{Category, Marker};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a record with id '{0}' already exists")]
    DuplicateId(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Operations every backend provides.
///
/// Inserts store exactly what they are given. Deletes and color updates
/// return whether a record matched; a miss is not an error.
#[async_trait]
pub trait MapStore: Send + Sync {
    /// All markers, in insertion order
    async fn list_markers(&self) -> StoreResult<Vec<Marker>>;

    /// All categories, in insertion order
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    async fn get_marker(&self, id: &str) -> StoreResult<Option<Marker>>;

    async fn insert_marker(&self, marker: &Marker) -> StoreResult<()>;

    async fn insert_category(&self, category: &Category) -> StoreResult<()>;

    async fn delete_marker(&self, id: &str) -> StoreResult<bool>;

    async fn delete_category(&self, id: &str) -> StoreResult<bool>;

    async fn update_marker_color(&self, id: &str, color: &str) -> StoreResult<bool>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Stand-in used when the configured database target cannot be parsed.
/// Every operation fails, so each request is logged and dropped on its own.
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> StoreResult<T> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl MapStore for UnavailableStore {
    async fn list_markers(&self) -> StoreResult<Vec<Marker>> {
        self.fail()
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.fail()
    }

    async fn get_marker(&self, _id: &str) -> StoreResult<Option<Marker>> {
        self.fail()
    }

    async fn insert_marker(&self, _marker: &Marker) -> StoreResult<()> {
        self.fail()
    }

    async fn insert_category(&self, _category: &Category) -> StoreResult<()> {
        self.fail()
    }

    async fn delete_marker(&self, _id: &str) -> StoreResult<bool> {
        self.fail()
    }

    async fn delete_category(&self, _id: &str) -> StoreResult<bool> {
        self.fail()
    }

    async fn update_marker_color(&self, _id: &str, _color: &str) -> StoreResult<bool> {
        self.fail()
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Pick a backend from the configured database target.
///
/// No target means in-memory. A target that fails to connect is logged and
/// kept anyway: the pool connects lazily, so later requests retry on their own.
pub async fn open_store(database_url: Option<&str>) -> Arc<dyn MapStore> {
    let Some(url) = database_url else {
        tracing::info!("No DATABASE_URL set, markers and categories are kept in memory only");
        return Arc::new(MemoryStore::new());
    };

    let store = match SqliteStore::connect_lazy(url) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Invalid DATABASE_URL '{}': {}", url, e);
            return Arc::new(UnavailableStore::new(e.to_string()));
        }
    };

    match store.ensure_schema().await {
        Ok(()) => tracing::info!("Connected to database at {}", url),
        Err(e) => tracing::error!(
            "Failed to connect to database at {}: {}. Requests will fail until it is reachable.",
            url,
            e
        ),
    }

    Arc::new(store)
}
