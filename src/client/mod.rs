//! WebSocket client for the map server.
//!
//! [`MapClient`] speaks the same JSON frames as the browser page and can feed
//! a [`Reconciler`] to keep a headless mirror of the shared map.

mod reconciler;

pub use reconciler::{fallback_id, Reconciler, VisualLayer};

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::protocol::{ClientEvent, ServerEvent};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid event: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct MapClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl MapClient {
    /// Connect to a server's WebSocket endpoint, e.g. `ws://localhost:3000/ws`
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (stream, _response) = connect_async(url).await?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, event: &ClientEvent) -> Result<(), ClientError> {
        let json = serde_json::to_string(event)?;
        self.send_raw(&json).await
    }

    /// Send a text frame as-is, without checking that it is a valid event
    pub async fn send_raw(&mut self, text: &str) -> Result<(), ClientError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Next event from the server, or None once the connection is closed.
    /// Control frames are handled internally.
    pub async fn next_event(&mut self) -> Option<Result<ServerEvent, ClientError>> {
        while let Some(msg) = self.stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(text.as_str()).map_err(ClientError::from));
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }

    /// Receive one event and apply it to `reconciler`
    pub async fn sync_once<V: VisualLayer>(
        &mut self,
        reconciler: &mut Reconciler<V>,
    ) -> Option<Result<(), ClientError>> {
        let event = match self.next_event().await? {
            Ok(event) => event,
            Err(e) => return Some(Err(e)),
        };
        reconciler.apply(event);
        Some(Ok(()))
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
