// ============================
// parlor-backend-lib/src/ws_router.rs
// ============================
//! WebSocket router and connection handling.
use crate::metrics::{WS_CONNECTION, WS_DISCONNECTION};
use crate::room::{ConnectionId, RoomHandle};
use crate::storage::MessageStore;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use metrics::counter;
use parlor_common::ClientEvent;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Handshake query parameters for `/ws`
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub username: String,
}

/// Create the WebSocket router
pub fn router<S>(state: Arc<AppState<S>>) -> Router
where
    S: MessageStore + Clone + 'static,
{
    Router::new()
        .route("/ws", get(ws_handler::<S>))
        .with_state(state)
}

/// Handler for WebSocket connections.
///
/// The claimed username comes from the handshake query and is trusted
/// as-is; session authentication happens on the HTTP surface.
pub async fn ws_handler<S>(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, StatusCode>
where
    S: MessageStore + Clone + 'static,
{
    let username = query.username.trim().to_string();
    if username.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    counter!(WS_CONNECTION).increment(1);
    let room = state.room.clone();
    Ok(ws.on_upgrade(move |socket| handle_connection(socket, room, username)))
}

async fn handle_connection(socket: WebSocket, room: RoomHandle, username: String) {
    let conn_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();

    if room.attach(conn_id, username.clone(), tx).is_err() {
        tracing::error!("room actor unavailable, dropping connection for '{username}'");
        return;
    }

    let (mut sink, mut stream) = socket.split();

    // Forward room events to the socket as JSON text frames
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("failed to serialize server event: {e}");
                    continue;
                },
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // A malformed frame is a transport error: close the connection and
    // let the detach path clean up, same as a network drop.
    while let Some(Ok(frame)) = stream.next().await {
        match frame {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    if dispatch(&room, conn_id, event).is_err() {
                        break;
                    }
                },
                Err(e) => {
                    tracing::warn!("malformed frame from '{username}': {e}");
                    break;
                },
            },
            Message::Close(_) => break,
            _ => {},
        }
    }

    let _ = room.detach(conn_id);
    counter!(WS_DISCONNECTION).increment(1);
    send_task.abort();
}

fn dispatch(
    room: &RoomHandle,
    conn_id: ConnectionId,
    event: ClientEvent,
) -> Result<(), crate::error::AppError> {
    match event {
        ClientEvent::Message { content, username } => room.submit(conn_id, content, username),
        ClientEvent::TypingStart { username } => room.typing_start(username),
        ClientEvent::TypingEnd { username } => room.typing_end(username),
    }
}
