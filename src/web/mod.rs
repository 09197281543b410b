//! Web dashboard for live telemetry.
//!
//! Serves the latest reading over a WebSocket, channel history over a small
//! JSON API, and a built-in dashboard page that plots history on demand.

pub mod config;
pub mod handlers;
pub mod router;
pub mod websocket;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;

use crate::display::{DashboardState, DashboardUpdate};
use crate::error::{Result, TelemetryError};
use crate::store::HistoryReader;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::info;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Latest values, written only by the dashboard drain task
    pub dashboard: Arc<RwLock<DashboardState>>,
    /// Read-only access to the session log
    pub history: HistoryReader,
    /// Fan-out of dashboard updates to WebSocket clients
    pub updates: broadcast::Sender<DashboardUpdate>,
    /// Connected WebSocket clients
    pub clients: Arc<RwLock<HashMap<String, websocket::Client>>>,
    /// Connection limit
    pub max_websocket_connections: usize,
}

impl AppState {
    /// Create state around a dashboard and a log reader.
    pub fn new(
        dashboard: Arc<RwLock<DashboardState>>,
        history: HistoryReader,
        updates: broadcast::Sender<DashboardUpdate>,
        config: &WebConfig,
    ) -> Self {
        Self {
            dashboard,
            history,
            updates,
            clients: Arc::new(RwLock::new(HashMap::new())),
            max_websocket_connections: config.max_websocket_connections,
        }
    }
}

/// Start the web server and run it until `shutdown` resolves.
pub async fn start_web_server<F>(config: WebConfig, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app(&config, state)?;

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| TelemetryError::config_error(format!("Invalid bind address: {}", e)))?;

    info!("Dashboard available at http://{}/", addr);
    info!("History endpoint: http://{}/api/history/<channel>", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        TelemetryError::web_server_error(format!("Failed to bind to address: {}", e))
    })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| TelemetryError::web_server_error(format!("Server error: {}", e)))?;

    info!("Web server stopped");
    Ok(())
}
