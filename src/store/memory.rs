use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MapStore, StoreError, StoreResult};
use crate::types::{Category, Marker};

/// Volatile backend. Everything is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    markers: RwLock<Vec<Marker>>,
    categories: RwLock<Vec<Category>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MapStore for MemoryStore {
    async fn list_markers(&self) -> StoreResult<Vec<Marker>> {
        Ok(self.markers.read().await.clone())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.categories.read().await.clone())
    }

    async fn get_marker(&self, id: &str) -> StoreResult<Option<Marker>> {
        Ok(self
            .markers
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn insert_marker(&self, marker: &Marker) -> StoreResult<()> {
        let mut markers = self.markers.write().await;
        if markers.iter().any(|m| m.id == marker.id) {
            return Err(StoreError::DuplicateId(marker.id.clone()));
        }
        markers.push(marker.clone());
        Ok(())
    }

    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        let mut categories = self.categories.write().await;
        if categories.iter().any(|c| c.id == category.id) {
            return Err(StoreError::DuplicateId(category.id.clone()));
        }
        categories.push(category.clone());
        Ok(())
    }

    async fn delete_marker(&self, id: &str) -> StoreResult<bool> {
        let mut markers = self.markers.write().await;
        let before = markers.len();
        markers.retain(|m| m.id != id);
        Ok(markers.len() != before)
    }

    async fn delete_category(&self, id: &str) -> StoreResult<bool> {
        let mut categories = self.categories.write().await;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        Ok(categories.len() != before)
    }

    async fn update_marker_color(&self, id: &str, color: &str) -> StoreResult<bool> {
        let mut markers = self.markers.write().await;
        match markers.iter_mut().find(|m| m.id == id) {
            Some(marker) => {
                marker.color = color.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coords;

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
    async fn test_insert_keeps_order_and_fields() {
        let store = MemoryStore::new();
        store.insert_marker(&marker("a")).await.unwrap();
        store.insert_marker(&marker("b")).await.unwrap();

        let markers = store.list_markers().await.unwrap();
        let ids: Vec<_> = markers.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(markers[0], marker("a"));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let store = MemoryStore::new();
        store.insert_marker(&marker("a")).await.unwrap();

        let result = store.insert_marker(&marker("a")).await;
        assert!(matches!(result, Err(StoreError::DuplicateId(id)) if id == "a"));
        assert_eq!(store.list_markers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let store = MemoryStore::new();
        store.insert_marker(&marker("a")).await.unwrap();

        assert!(!store.delete_marker("ghost").await.unwrap());
        assert_eq!(store.list_markers().await.unwrap().len(), 1);
        assert!(store.delete_marker("a").await.unwrap());
        assert!(store.list_markers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_color_touches_only_color() {
        let store = MemoryStore::new();
        store.insert_marker(&marker("a")).await.unwrap();

        assert!(store.update_marker_color("a", "#0000ff").await.unwrap());
        assert!(!store.update_marker_color("ghost", "#0000ff").await.unwrap());

        let updated = store.get_marker("a").await.unwrap().unwrap();
        assert_eq!(updated.color, "#0000ff");
        assert_eq!(updated.title, "Safehouse");
        assert_eq!(updated.coords, Coords::new(100.0, 200.0));
    }

    #[tokio::test]
    async fn test_categories() {
        let store = MemoryStore::new();
        let gangs = Category {
            id: "c1".into(),
            name: "Gangs".into(),
            color: "#00ff00".into(),
        };
        store.insert_category(&gangs).await.unwrap();
        assert!(store.insert_category(&gangs).await.is_err());
        assert_eq!(store.list_categories().await.unwrap(), vec![gangs]);

        assert!(store.delete_category("c1").await.unwrap());
        assert!(!store.delete_category("c1").await.unwrap());
    }
}
