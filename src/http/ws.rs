use super::messages::{to_ws_message, ClientMessage};
use super::state::AppState;
use crate::session::{Emission, Session, SessionConfig, SessionEvent};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// GET /ws
/// Upgrade to a WebSocket carrying one voice session
pub async fn voice_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = uuid::Uuid::new_v4().to_string();
    info!("A user connected: {}", session_id);

    let (mut sender, mut receiver) = socket.split();

    let config: SessionConfig = state.session_config.as_ref().clone();
    let (emit_tx, mut emit_rx) = mpsc::channel::<Emission>(config.queue_capacity);
    let rejections = emit_tx.clone();
    let (events, session_task) =
        Session::spawn(session_id.clone(), config, state.services.clone(), emit_tx);

    // Outgoing: session emissions -> socket
    let sender_task = tokio::spawn(async move {
        while let Some(emission) = emit_rx.recv().await {
            let msg = match to_ws_message(emission) {
                Ok(msg) => msg,
                Err(e) => {
                    error!("Failed to serialize outgoing message: {}", e);
                    continue;
                }
            };

            if let Err(e) = sender.send(msg).await {
                warn!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    // Incoming: socket -> session events
    while let Some(msg) = receiver.next().await {
        let event = match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(control) => SessionEvent::Control(control.into()),
                Err(e) => {
                    warn!("Failed to parse client message: {}", e);
                    let _ = rejections
                        .send(Emission::Error {
                            message: format!("Invalid message format: {}", e),
                        })
                        .await;
                    continue;
                }
            },
            Ok(Message::Binary(chunk)) => SessionEvent::Audio(chunk),
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Err(e) => {
                warn!("WebSocket error on {}: {}", session_id, e);
                break;
            }
        };

        if events.send(event).await.is_err() {
            error!("Session {} stopped taking events", session_id);
            break;
        }
    }

    info!("User disconnected: {}", session_id);

    let _ = events.send(SessionEvent::Disconnect).await;
    match session_task.await {
        Ok(stats) => info!(
            "Session {} stats: {}",
            session_id,
            serde_json::to_string(&stats).unwrap_or_default()
        ),
        Err(e) => error!("Session task for {} panicked: {}", session_id, e),
    }

    sender_task.abort();
}
