//! HTTP chat backend for keel.
//!
//! `keel-web` exposes a [`ChatService`] over a small REST API:
//!
//! | Route | Body | Response |
//! |-------|------|----------|
//! | `GET /api/models` | | `{"models": {id: {"name", "backend"}}, "default": id}` |
//! | `POST /api/chat` | `{"message", "session_id"?, "model"?}` | `text/event-stream` of `{"content"}` frames |
//! | `POST /api/clear` | `{"session_id"?}` | `{"status": "success"}` |
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use keel::chat::ChatService;
//! use keel::registry::ModelRegistry;
//! use keel::store::InMemoryStore;
//! use keel_web::{WebConfig, spawn_web};
//!
//! let chat = ChatService::new(
//!     Arc::new(InMemoryStore::new()),
//!     ModelRegistry::from_env()?,
//!     Default::default(),
//! );
//! let addr = spawn_web(Arc::new(chat), WebConfig::default()).await?;
//! println!("Listening on http://{addr}");
//! ```

pub mod api;
mod server;

pub use api::{AppState, ApiError, ErrorResponse};
pub use server::build_router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use keel::chat::ChatService;

/// Configuration for the web server.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:5000`.
    pub bind_addr: SocketAddr,
    /// Directory served for any path outside `/api`. `None` serves the API
    /// only.
    pub static_dir: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            static_dir: None,
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// Binding port 0 picks a free port. The server runs until the Tokio runtime
/// shuts down.
pub async fn spawn_web(chat: Arc<ChatService>, config: WebConfig) -> std::io::Result<SocketAddr> {
    let router = server::build_router(AppState { chat }, config.static_dir);
    server::start_server(router, config.bind_addr).await
}
