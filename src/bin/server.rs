//! Triplog Room Server
//!
//! Hosts shared sync rooms so two participants can exchange trip snapshots.
//!
//! # Configuration
//!
//! Environment variables:
//! - `TRIPLOG_PORT`: Port to listen on (default: 8080)
//! - `TRIPLOG_SERVER_DATA_DIR`: Directory to store rooms (default: ~/.local/share/triplog-server)
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint
//! - `GET /rooms`: WebSocket endpoint for the room protocol

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triplog::server::{router, RoomHub, ServerStorage};

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// Directory to store rooms
    data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("TRIPLOG_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("TRIPLOG_SERVER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("triplog-server")
            });

        Self { port, data_dir }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triplog_server=info,triplog=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    // Ensure data directory exists
    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        tracing::error!("Failed to create data directory: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Data directory: {}", config.data_dir.display());

    let hub = match RoomHub::load(ServerStorage::new(&config.data_dir)) {
        Ok(hub) => Arc::new(hub),
        Err(e) => {
            tracing::error!("Failed to load rooms: {}", e);
            std::process::exit(1);
        }
    };

    let app = router(hub);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
