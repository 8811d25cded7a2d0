use crate::config::DEFAULT_BROADCAST_CAPACITY;
use crate::protocol::ServerEvent;
use crate::store::{MapStore, MemoryStore};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard};

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn MapStore>,
    /// Fan-out channel every connection subscribes to
    pub broadcast: broadcast::Sender<ServerEvent>,
    /// Held while one request is applied and broadcast, so events reach
    /// every client in the order they were applied
    turn: Mutex<()>,
}

impl AppState {
    pub fn new(store: Arc<dyn MapStore>, broadcast_capacity: usize) -> Self {
        // tokio's broadcast channel panics on zero capacity
        let (tx, _rx) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            store,
            broadcast: tx,
            turn: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), DEFAULT_BROADCAST_CAPACITY)
    }

    /// Wait until no other request is being applied
    pub async fn take_turn(&self) -> MutexGuard<'_, ()> {
        self.turn.lock().await
    }

    /// Send an event to every connected client, including the one that caused it
    pub fn broadcast_to_all(&self, event: ServerEvent) {
        // Err only means nobody is connected
        if self.broadcast.send(event).is_err() {
            tracing::debug!("Broadcast dropped: no clients connected");
        }
    }

    /// Full-state push for one connection: `loadMarkers` then `loadCategories`.
    ///
    /// A collection that cannot be read is logged and left out.
    pub async fn initial_events(&self) -> Vec<ServerEvent> {
        let mut events = Vec::with_capacity(2);

        match self.store.list_markers().await {
            Ok(markers) => events.push(ServerEvent::LoadMarkers(markers)),
            Err(e) => tracing::error!("Failed to load markers from {}: {}", self.store.name(), e),
        }

        match self.store.list_categories().await {
            Ok(categories) => events.push(ServerEvent::LoadCategories(categories)),
            Err(e) => tracing::error!(
                "Failed to load categories from {}: {}",
                self.store.name(),
                e
            ),
        }

        events
    }

    /// Register a new connection.
    ///
    /// Subscribing and reading the snapshot happen in the same turn, so the
    /// connection sees every later event exactly once.
    pub async fn join(&self) -> (broadcast::Receiver<ServerEvent>, Vec<ServerEvent>) {
        let _turn = self.take_turn().await;
        let rx = self.broadcast.subscribe();
        let events = self.initial_events().await;
        (rx, events)
    }

    /// Number of live subscriptions
    pub fn connection_count(&self) -> usize {
        self.broadcast.receiver_count()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UnavailableStore;
    use crate::types::{Category, Coords, Marker};

    #[tokio::test]
    async fn test_join_pushes_markers_then_categories() {
        let state = AppState::in_memory();
        let marker = Marker {
            id: "m1".into(),
            coords: Coords::new(1.0, 2.0),
            title: "Safehouse".into(),
            description: "stash".into(),
            color: "#ff0000".into(),
        };
        let category = Category {
            id: "c1".into(),
            name: "Gangs".into(),
            color: "#00ff00".into(),
        };
        state.store.insert_marker(&marker).await.unwrap();
        state.store.insert_category(&category).await.unwrap();

        let (_rx, events) = state.join().await;
        assert_eq!(
            events,
            vec![
                ServerEvent::LoadMarkers(vec![marker]),
                ServerEvent::LoadCategories(vec![category]),
            ]
        );
        assert_eq!(state.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let state = AppState::in_memory();
        let (mut a, _) = state.join().await;
        let (mut b, _) = state.join().await;

        state.broadcast_to_all(ServerEvent::MarkerDeleted("m1".into()));

        assert_eq!(a.recv().await.unwrap(), ServerEvent::MarkerDeleted("m1".into()));
        assert_eq!(b.recv().await.unwrap(), ServerEvent::MarkerDeleted("m1".into()));
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let state = AppState::new(Arc::new(MemoryStore::new()), 0);
        let (mut rx, _) = state.join().await;

        state.broadcast_to_all(ServerEvent::MarkerDeleted("m1".into()));
        assert_eq!(rx.recv().await.unwrap(), ServerEvent::MarkerDeleted("m1".into()));
    }

    #[tokio::test]
    async fn test_broadcast_without_clients_is_fine() {
        let state = AppState::in_memory();
        state.broadcast_to_all(ServerEvent::DeleteCategory("c1".into()));
        assert_eq!(state.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_store_sends_nothing_on_join() {
        let state = AppState::new(Arc::new(UnavailableStore::new("down")), 8);
        let (_rx, events) = state.join().await;
        assert!(events.is_empty());
    }
}
