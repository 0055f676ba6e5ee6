//! WebSocket transport binding.
//!
//! The socket is a dumb pipe: inbound text frames are parsed into
//! [`ClientIntent`]s and handed to the dispatcher; outbound events are
//! drained from the connection's channel and written as JSON. All game
//! logic lives behind the hub, so nothing here holds state beyond the
//! connection id.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bus::ClientIntent;
use crate::server::hub::{handle_disconnect, handle_intent, AppState};

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_session(state, socket))
}

/// One connected client, from upgrade to hangup. The connection id is
/// server-issued and doubles as the player id for the session.
async fn client_session(state: AppState, socket: WebSocket) {
    let conn_id = Uuid::new_v4().to_string();
    let (sender, mut outbound) = mpsc::unbounded_channel();
    state.hub.lock().await.register(conn_id.clone(), sender);
    info!(conn = %conn_id, "client connected");

    let (mut sink, mut stream) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%err, "failed to encode event");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientIntent>(&text) {
                Ok(intent) => handle_intent(&state, &conn_id, intent).await,
                Err(err) => warn!(conn = %conn_id, %err, "unparseable intent dropped"),
            },
            Message::Close(_) => break,
            other => debug!(conn = %conn_id, ?other, "ignoring non-text frame"),
        }
    }

    handle_disconnect(&state, &conn_id).await;
    writer.abort();
    info!(conn = %conn_id, "client disconnected");
}
