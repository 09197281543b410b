//! WebSocket handler for live dashboard updates.

use crate::display::DashboardUpdate;
use crate::web::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::time::SystemTime;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, error, info, warn};

/// A connected dashboard client.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: String,
    pub connected_at: SystemTime,
}

/// WebSocket upgrade handler.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle a WebSocket connection: snapshot first, then every update.
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let client_id = uuid::Uuid::new_v4().to_string();

    {
        let mut clients = state.clients.write().await;
        if clients.len() >= state.max_websocket_connections {
            warn!(
                "Rejecting client {}: {} connections already open",
                client_id,
                clients.len()
            );
            return;
        }
        clients.insert(
            client_id.clone(),
            Client {
                id: client_id.clone(),
                connected_at: SystemTime::now(),
            },
        );
    }
    info!("WebSocket client connected: {}", client_id);

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before taking the snapshot so no update falls in between.
    let mut updates = BroadcastStream::new(state.updates.subscribe());
    let snapshot = state.dashboard.read().await.snapshot();

    let client_id_send = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        if send_update(&mut sender, &snapshot).await.is_err() {
            return;
        }
        while let Some(item) = updates.next().await {
            match item {
                Ok(update) => {
                    if let Err(e) = send_update(&mut sender, &update).await {
                        warn!("Failed to send update to client {}: {}", client_id_send, e);
                        break;
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("Client {} lagged, skipped {} updates", client_id_send, skipped);
                }
            }
        }
    });

    let client_id_recv = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(_) => debug!("Ignoring message from {}", client_id_recv),
                Err(e) => {
                    warn!("WebSocket error for client {}: {}", client_id_recv, e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            debug!("Send task completed for client {}", client_id);
        }
        _ = &mut recv_task => {
            send_task.abort();
            debug!("Receive task completed for client {}", client_id);
        }
    }

    state.clients.write().await.remove(&client_id);
    info!("WebSocket client disconnected: {}", client_id);
}

async fn send_update<S>(sender: &mut S, update: &DashboardUpdate) -> Result<(), axum::Error>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(update) {
        Ok(text) => sender.send(Message::Text(text)).await,
        Err(e) => {
            error!("Failed to serialize dashboard update: {}", e);
            Ok(())
        }
    }
}

/// Number of connected WebSocket clients.
pub async fn connected_client_count(state: &AppState) -> usize {
    state.clients.read().await.len()
}
