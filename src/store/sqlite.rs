//! Durable backend on SQLite.
//!
//! The pool connects lazily and the schema is migrated on first use, so a
//! database that is unreachable at startup only fails the requests that hit it.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{MapStore, StoreError, StoreResult};
use crate::types::{Category, Coords, Marker};

type MarkerRow = (String, f64, f64, String, String, String);
type CategoryRow = (String, String, String);

fn marker_from_row((id, lat, lng, title, description, color): MarkerRow) -> Marker {
    Marker {
        id,
        coords: Coords::new(lat, lng),
        title,
        description,
        color,
    }
}

fn category_from_row((id, name, color): CategoryRow) -> Category {
    Category { id, name, color }
}

/// Map a primary key collision to `DuplicateId`, everything else to `Database`
fn insert_error(e: sqlx::Error, id: &str) -> StoreError {
    let duplicate = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if duplicate {
        StoreError::DuplicateId(id.to_string())
    } else {
        StoreError::Database(e)
    }
}

pub struct SqliteStore {
    pool: SqlitePool,
    schema: OnceCell<()>,
}

impl SqliteStore {
    /// Build a store without touching the database yet.
    ///
    /// Accepts `sqlite://path`, `sqlite:path` or a bare file path.
    pub fn connect_lazy(database_url: &str) -> StoreResult<Self> {
        if database_url.contains("://") && !database_url.starts_with("sqlite:") {
            return Err(StoreError::Unavailable(format!(
                "unsupported database scheme in '{}'",
                database_url
            )));
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            schema: OnceCell::new(),
        })
    }

    /// Connect and migrate right away
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let store = Self::connect_lazy(database_url)?;
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Run migrations once. A failed attempt is retried on the next call.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        self.schema
            .get_or_try_init(|| async {
                sqlx::migrate!("./migrations").run(&self.pool).await?;
                tracing::debug!("Database schema is up to date");
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    async fn pool(&self) -> StoreResult<&SqlitePool> {
        self.ensure_schema().await?;
        Ok(&self.pool)
    }
}

#[async_trait]
impl MapStore for SqliteStore {
    async fn list_markers(&self) -> StoreResult<Vec<Marker>> {
        let rows = sqlx::query_as::<_, MarkerRow>(
            "SELECT id, lat, lng, title, description, color FROM markers ORDER BY seq",
        )
        .fetch_all(self.pool().await?)
        .await?;
        Ok(rows.into_iter().map(marker_from_row).collect())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows =
            sqlx::query_as::<_, CategoryRow>("SELECT id, name, color FROM categories ORDER BY seq")
                .fetch_all(self.pool().await?)
                .await?;
        Ok(rows.into_iter().map(category_from_row).collect())
    }

    async fn get_marker(&self, id: &str) -> StoreResult<Option<Marker>> {
        let row = sqlx::query_as::<_, MarkerRow>(
            "SELECT id, lat, lng, title, description, color FROM markers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool().await?)
        .await?;
        Ok(row.map(marker_from_row))
    }

    async fn insert_marker(&self, marker: &Marker) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO markers (id, lat, lng, title, description, color)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&marker.id)
        .bind(marker.coords.lat)
        .bind(marker.coords.lng)
        .bind(&marker.title)
        .bind(&marker.description)
        .bind(&marker.color)
        .execute(self.pool().await?)
        .await
        .map_err(|e| insert_error(e, &marker.id))?;
        Ok(())
    }

    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        sqlx::query("INSERT INTO categories (id, name, color) VALUES (?, ?, ?)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.color)
            .execute(self.pool().await?)
            .await
            .map_err(|e| insert_error(e, &category.id))?;
        Ok(())
    }

    async fn delete_marker(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM markers WHERE id = ?")
            .bind(id)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_category(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_marker_color(&self, id: &str, color: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE markers SET color = ? WHERE id = ?")
            .bind(color)
            .bind(id)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn url(path: &Path) -> String {
        format!("sqlite://{}", path.display())
    }

    fn marker(id: &str) -> Marker {
        Marker {
            id: id.to_string(),
            coords: Coords::new(100.0, 200.0),
            title: "Safehouse".to_string(),
            description: "stash".to_string(),
            color: "#ff0000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_marker_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::connect(&url(&dir.path().join("map.db")))
            .await
            .unwrap();

        store.insert_marker(&marker("a")).await.unwrap();
        store.insert_marker(&marker("b")).await.unwrap();
        assert_eq!(store.list_markers().await.unwrap()[0], marker("a"));

        assert!(store.update_marker_color("b", "#00ff00").await.unwrap());
        let b = store.get_marker("b").await.unwrap().unwrap();
        assert_eq!(b.color, "#00ff00");
        assert_eq!(b.description, "stash");

        assert!(store.delete_marker("a").await.unwrap());
        assert!(!store.delete_marker("a").await.unwrap());
        assert!(!store.update_marker_color("a", "#000000").await.unwrap());
        assert_eq!(store.list_markers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_maps_to_duplicate_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::connect(&url(&dir.path().join("map.db")))
            .await
            .unwrap();

        store.insert_marker(&marker("a")).await.unwrap();
        let result = store.insert_marker(&marker("a")).await;
        assert!(matches!(result, Err(StoreError::DuplicateId(id)) if id == "a"));
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_url = url(&dir.path().join("map.db"));
        let gangs = Category {
            id: "c1".into(),
            name: "Gangs".into(),
            color: "#00ff00".into(),
        };

        {
            let store = SqliteStore::connect(&db_url).await.unwrap();
            store.insert_marker(&marker("a")).await.unwrap();
            store.insert_category(&gangs).await.unwrap();
            store.pool.close().await;
        }

        let reopened = SqliteStore::connect(&db_url).await.unwrap();
        assert_eq!(reopened.list_markers().await.unwrap(), vec![marker("a")]);
        assert_eq!(reopened.list_categories().await.unwrap(), vec![gangs]);
    }

    #[tokio::test]
    async fn test_unreachable_database_fails_per_request() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no/such/dir/map.db");
        let store = SqliteStore::connect_lazy(&url(&missing)).unwrap();

        assert!(store.ensure_schema().await.is_err());
        assert!(store.list_markers().await.is_err());
    }

    #[test]
    fn test_foreign_scheme_is_rejected() {
        let result = SqliteStore::connect_lazy("mongodb://localhost:27017/map");
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
