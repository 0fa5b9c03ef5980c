//! WebSocket chat endpoint
//!
//! Each connection is registered so broadcasts can reach it; a single
//! writer task owns the socket sink, fed by one channel that both the
//! connection's own questions and registry broadcasts push into.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::server::AppState;
use crate::chat::RetrievalEvent;

pub async fn async_chat_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut incoming) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<RetrievalEvent>();
    let connection_id = Uuid::new_v4();

    state.registry.register(connection_id, tx.clone()).await;

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            // The terminal marker stays server-side; clients see the
            // stream end when the next question's events begin.
            if matches!(event, RetrievalEvent::Done) {
                continue;
            }
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = incoming.next().await {
        match message {
            Ok(Message::Text(question)) => {
                let mut events = state.chat.stream_answer(question);
                while let Some(event) = events.next().await {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!("WebSocket error on {}: {}", connection_id, e);
                break;
            }
            _ => {}
        }
    }

    state.registry.unregister(connection_id).await;
    drop(tx);
    let _ = writer.await;
    info!("Connection {} closed", connection_id);
}
