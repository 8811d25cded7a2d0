//! WebSocket message dispatch
//!
//! Every inbound request goes through [`handle_message`]: it takes the
//! dispatch turn, validates, applies the change to the store and broadcasts
//! the resulting event to all connections. Each event kind has its own
//! handler returning a `Result`; the dispatcher decides what a failure means
//! for the originator.

use crate::protocol::{ClientEvent, ServerEvent, ValidationError};
use crate::state::AppState;
use crate::store::StoreError;
use crate::types::*;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("invalid {event} payload: {source}")]
    Invalid {
        event: &'static str,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type RouterResult = Result<ServerEvent, RouterError>;

/// Apply one client request and broadcast its outcome.
///
/// Returns a reply for the originator only when the request was rejected.
/// Store failures are logged and produce neither a broadcast nor a reply.
pub async fn handle_message(msg: ClientEvent, state: &Arc<AppState>) -> Option<ServerEvent> {
    let event_name = msg.name();
    let _turn = state.take_turn().await;

    match dispatch(msg, state).await {
        Ok(event) => {
            state.broadcast_to_all(event);
            None
        }
        Err(e @ RouterError::Invalid { .. }) => {
            tracing::warn!("Rejected {}: {}", event_name, e);
            Some(ServerEvent::error("INVALID_PAYLOAD", e.to_string()))
        }
        Err(RouterError::Store(StoreError::DuplicateId(id))) => {
            tracing::warn!("Rejected {}: id '{}' already exists", event_name, id);
            Some(ServerEvent::error(
                "DUPLICATE_ID",
                format!("A record with id '{}' already exists", id),
            ))
        }
        Err(RouterError::Store(e)) => {
            tracing::error!("{} failed, nothing broadcast: {}", event_name, e);
            None
        }
    }
}

async fn dispatch(msg: ClientEvent, state: &Arc<AppState>) -> RouterResult {
    msg.validate().map_err(|source| RouterError::Invalid {
        event: msg.name(),
        source,
    })?;

    match msg {
        ClientEvent::AddMarker(marker) => add_marker(state, marker).await,
        ClientEvent::DeleteMarker(id) => delete_marker(state, id).await,
        ClientEvent::UpdateMarkerColor(update) => update_marker_color(state, update).await,
        ClientEvent::AddCategory(category) => add_category(state, category).await,
        ClientEvent::DeleteCategory(id) => delete_category(state, id).await,
    }
}

async fn add_marker(state: &Arc<AppState>, mut marker: Marker) -> RouterResult {
    if marker.id.trim().is_empty() {
        marker.id = new_id();
    }
    state.store.insert_marker(&marker).await?;
    tracing::info!("Marker added: {} ({})", marker.id, marker.title);
    Ok(ServerEvent::NewMarker(marker))
}

async fn delete_marker(state: &Arc<AppState>, id: MarkerId) -> RouterResult {
    if state.store.delete_marker(&id).await? {
        tracing::info!("Marker deleted: {}", id);
    } else {
        tracing::debug!("Marker {} not found, broadcasting deletion anyway", id);
    }
    Ok(ServerEvent::MarkerDeleted(id))
}

async fn update_marker_color(state: &Arc<AppState>, update: ColorUpdate) -> RouterResult {
    if state
        .store
        .update_marker_color(&update.marker_id, &update.new_color)
        .await?
    {
        tracing::info!(
            "Marker {} color set to {}",
            update.marker_id,
            update.new_color
        );
    } else {
        tracing::debug!("Marker {} not found for color update", update.marker_id);
    }
    Ok(ServerEvent::MarkerColorUpdated(update))
}

async fn add_category(state: &Arc<AppState>, mut category: Category) -> RouterResult {
    if category.id.trim().is_empty() {
        category.id = new_id();
    }
    state.store.insert_category(&category).await?;
    tracing::info!("Category added: {} ({})", category.id, category.name);
    Ok(ServerEvent::NewCategory(category))
}

async fn delete_category(state: &Arc<AppState>, id: CategoryId) -> RouterResult {
    if state.store.delete_category(&id).await? {
        tracing::info!("Category deleted: {}", id);
    } else {
        tracing::debug!("Category {} not found, broadcasting deletion anyway", id);
    }
    Ok(ServerEvent::DeleteCategory(id))
}
