//! HTTP surface: the root page, the WebSocket endpoint and the static file root.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;
use crate::ws;

pub fn app(state: Arc<AppState>, static_dir: &Path) -> Router {
    let index = static_dir.join("index.html");

    Router::new()
        .route("/", get(move || serve_index(index.clone())))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_index(path: PathBuf) -> Response {
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Html(content).into_response(),
        Err(e) => {
            tracing::warn!("Cannot read {}: {}", path.display(), e);
            (StatusCode::NOT_FOUND, "Map page not found").into_response()
        }
    }
}
