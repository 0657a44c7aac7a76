//! Chat backend server.
//!
//! Serves the keel chat API (and optionally a static frontend) until
//! interrupted. Models come from the built-in registry: the local Ollama
//! model is always available, the hosted one only when `OPENROUTER_KEY` is
//! set.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p keel-web
//! OPENROUTER_KEY=sk-... cargo run -p keel-web -- --port 8080 --static-dir frontend/static
//! RUST_LOG=keel=debug cargo run -p keel-web
//! ```
//!
//! ```bash
//! curl -N localhost:5000/api/chat -H 'content-type: application/json' \
//!      -d '{"message": "write a function that reverses a string"}'
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use keel::ChatConfig;
use keel::chat::ChatService;
use keel::registry::ModelRegistry;
use keel::store::InMemoryStore;
use keel_web::{WebConfig, spawn_web};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Chat backend for keel.
#[derive(Parser)]
#[command(name = "keel-web", about = "HTTP chat backend with streaming replies")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Directory of static frontend files to serve.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Most-recent messages kept verbatim in each context.
    #[arg(long, default_value_t = keel::config::DEFAULT_RECENT_WINDOW)]
    recent_window: usize,

    /// Word budget for each context.
    #[arg(long, default_value_t = keel::config::DEFAULT_TOKEN_BUDGET)]
    token_budget: usize,

    /// Seconds to wait for a conversation summary.
    #[arg(long, default_value_t = keel::config::DEFAULT_SUMMARY_TIMEOUT.as_secs())]
    summary_timeout: u64,

    /// Registry id of the model that writes summaries.
    #[arg(long)]
    summary_model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let registry = ModelRegistry::from_env().map_err(|e| e.to_string())?;

    let mut config = ChatConfig::new()
        .with_recent_window(args.recent_window)
        .with_token_budget(args.token_budget)
        .with_summary_timeout(Duration::from_secs(args.summary_timeout));
    if let Some(model) = args.summary_model {
        config = config.with_summary_model(model);
    }

    let chat = ChatService::new(Arc::new(InMemoryStore::new()), registry, config);

    let web_config = WebConfig {
        bind_addr: (args.host, args.port).into(),
        static_dir: args.static_dir,
    };
    let addr = spawn_web(Arc::new(chat), web_config)
        .await
        .map_err(|e| format!("failed to bind: {e}"))?;
    info!("Listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to wait for shutdown signal: {e}"))?;
    info!("Shutting down");
    Ok(())
}
