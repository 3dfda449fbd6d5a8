// WebSocket handler for live project chat.
// Clients only listen; messages are sent over HTTP and pushed to the room.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::{
    error::{AppError, Result},
    middleware::auth::decode_token,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
    pub project_id: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<Response> {
    let token = query.token.as_deref().ok_or(AppError::Unauthorized)?;
    let user = decode_token(token, &state.config.jwt_secret)?;
    state.messages().authorize(&query.project_id, &user.id).await?;

    tracing::info!(project_id = %query.project_id, user_id = %user.id, "chat socket joined");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, query.project_id, state)))
}

async fn handle_socket(socket: WebSocket, project_id: String, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let mut room_rx = state.rooms.subscribe(&project_id).await;

    // Sender wrapped in Arc<Mutex> for sharing
    let sender = Arc::new(tokio::sync::Mutex::new(sender));
    let sender_clone = sender.clone();

    // Task to forward room messages to this client
    let forward_task = tokio::spawn(async move {
        loop {
            let message = match room_rx.recv().await {
                Ok(message) => message,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "chat socket lagged behind its room");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let payload = match serde_json::to_string(message.as_ref()) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode chat message");
                    continue;
                }
            };

            let mut sender = sender_clone.lock().await;
            if sender.send(WsMessage::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            WsMessage::Close(_) => break,
            WsMessage::Ping(data) => {
                let mut sender = sender.lock().await;
                let _ = sender.send(WsMessage::Pong(data)).await;
            }
            _ => {}
        }
    }

    forward_task.abort();
    // Wait for the receiver to drop so the room can be pruned.
    let _ = forward_task.await;
    state.rooms.prune().await;

    tracing::debug!(project_id = %project_id, "chat socket closed");
}
