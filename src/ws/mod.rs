pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientEvent, ServerEvent};
use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serialize and send one event. Err means the peer is gone.
async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to serialize event: {}", e);
            Ok(())
        }
    }
}

async fn send_all(
    sender: &mut SplitSink<WebSocket, Message>,
    events: &[ServerEvent],
) -> Result<(), axum::Error> {
    for event in events {
        send_event(sender, event).await?;
    }
    Ok(())
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = ulid::Ulid::new();
    let (mut sender, mut receiver) = socket.split();

    let (mut broadcast_rx, initial) = state.join().await;
    tracing::info!(
        "Client connected: {} ({} connected)",
        conn_id,
        state.connection_count()
    );

    if send_all(&mut sender, &initial).await.is_err() {
        tracing::warn!("Client {} left during initial sync", conn_id);
        return;
    }

    loop {
        tokio::select! {
            broadcast_msg = broadcast_rx.recv() => {
                match broadcast_msg {
                    Ok(event) => {
                        if send_event(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Client {} lagged behind by {} events, resending full state",
                            conn_id,
                            skipped
                        );
                        let resync = {
                            let _turn = state.take_turn().await;
                            // Anything still queued is already in the snapshot
                            broadcast_rx = broadcast_rx.resubscribe();
                            state.initial_events().await
                        };
                        if send_all(&mut sender, &resync).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received from {}: {}", conn_id, text.as_str());

                        let reply = match serde_json::from_str::<ClientEvent>(text.as_str()) {
                            Ok(client_msg) => handlers::handle_message(client_msg, &state).await,
                            Err(e) => {
                                tracing::warn!("Failed to parse message from {}: {}", conn_id, e);
                                Some(ServerEvent::error(
                                    "PARSE_ERROR",
                                    format!("Invalid message format: {}", e),
                                ))
                            }
                        };

                        if let Some(reply) = reply {
                            if send_event(&mut sender, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error on {}: {}", conn_id, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    drop(broadcast_rx);
    tracing::info!(
        "Client disconnected: {} ({} connected)",
        conn_id,
        state.connection_count()
    );
}
