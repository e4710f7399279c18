// ============================
// parlor-backend-lib/src/room.rs
// ============================
//! The room actor: connection registry, typing-presence set, and the
//! persist-then-broadcast pipeline for the single global room.
//!
//! All registry mutation, message acceptance, and presence mutation is
//! serialized through one actor task; components hold a [`RoomHandle`]
//! and talk to the actor over an mpsc command channel. This gives every
//! connection the same broadcast order without any shared locks.
use crate::error::AppError;
use crate::metrics::{MESSAGE_ACCEPTED, MESSAGE_REJECTED, WS_ACTIVE};
use crate::storage::{MessageStore, HISTORY_LIMIT};
use chrono::Utc;
use metrics::{counter, gauge};
use parlor_common::{ChatMessage, ServerEvent};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Maximum accepted message length in characters; content is stored
/// verbatim below this cap, never escaped or truncated.
pub const MAX_CONTENT_LEN: usize = 2000;

/// Command sent *into* the actor
#[derive(Debug)]
pub enum RoomCmd {
    Attach {
        conn_id: ConnectionId,
        username: String,
        tx: mpsc::UnboundedSender<ServerEvent>,
    },
    Detach {
        conn_id: ConnectionId,
    },
    Submit {
        conn_id: ConnectionId,
        content: String,
        username: String,
    },
    TypingStart {
        username: String,
    },
    TypingEnd {
        username: String,
    },
}

/// Handle that other components keep: the actor's command channel
#[derive(Clone)]
pub struct RoomHandle {
    cmd_tx: mpsc::UnboundedSender<RoomCmd>,
}

impl RoomHandle {
    pub fn attach(
        &self,
        conn_id: ConnectionId,
        username: String,
        tx: mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<(), AppError> {
        self.cmd_tx.send(RoomCmd::Attach {
            conn_id,
            username,
            tx,
        })?;
        Ok(())
    }

    pub fn detach(&self, conn_id: ConnectionId) -> Result<(), AppError> {
        self.cmd_tx.send(RoomCmd::Detach { conn_id })?;
        Ok(())
    }

    pub fn submit(
        &self,
        conn_id: ConnectionId,
        content: String,
        username: String,
    ) -> Result<(), AppError> {
        self.cmd_tx.send(RoomCmd::Submit {
            conn_id,
            content,
            username,
        })?;
        Ok(())
    }

    pub fn typing_start(&self, username: String) -> Result<(), AppError> {
        self.cmd_tx.send(RoomCmd::TypingStart { username })?;
        Ok(())
    }

    pub fn typing_end(&self, username: String) -> Result<(), AppError> {
        self.cmd_tx.send(RoomCmd::TypingEnd { username })?;
        Ok(())
    }
}

/// Per-connection entry in the registry
struct ClientHandle {
    username: String,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

pub struct RoomActor {
    storage: Box<dyn MessageStore>,
    connections: HashMap<ConnectionId, ClientHandle>,
    typing: HashSet<String>,
}

impl RoomActor {
    pub fn new(storage: impl MessageStore + 'static) -> Self {
        RoomActor {
            storage: Box::new(storage),
            connections: HashMap::new(),
            typing: HashSet::new(),
        }
    }

    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<RoomCmd>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                RoomCmd::Attach {
                    conn_id,
                    username,
                    tx,
                } => self.handle_attach(conn_id, username, tx).await,
                RoomCmd::Detach { conn_id } => self.handle_detach(conn_id),
                RoomCmd::Submit {
                    conn_id,
                    content,
                    username,
                } => self.handle_submit(conn_id, content, username).await,
                RoomCmd::TypingStart { username } => self.handle_typing_start(username),
                RoomCmd::TypingEnd { username } => self.handle_typing_end(username),
            }
        }
    }

    /// Register the connection and push the history window to it alone.
    /// Attach is silent to the rest of the room.
    async fn handle_attach(
        &mut self,
        conn_id: ConnectionId,
        username: String,
        tx: mpsc::UnboundedSender<ServerEvent>,
    ) {
        self.connections.insert(
            conn_id,
            ClientHandle {
                username: username.clone(),
                tx: tx.clone(),
            },
        );
        gauge!(WS_ACTIVE).increment(1.0);
        tracing::info!("client '{username}' attached ({conn_id})");

        match self.storage.recent_messages(HISTORY_LIMIT).await {
            Ok(messages) => {
                let _ = tx.send(ServerEvent::PreviousMessages { messages });
            },
            // the connection stays attached; it just starts without history
            Err(e) => tracing::warn!("failed to load history for '{username}': {e}"),
        }
    }

    /// Idempotent: a connection id that is not registered is a no-op and
    /// produces no broadcast.
    fn handle_detach(&mut self, conn_id: ConnectionId) {
        let Some(client) = self.connections.remove(&conn_id) else {
            return;
        };
        gauge!(WS_ACTIVE).decrement(1.0);
        tracing::info!("client '{}' detached ({conn_id})", client.username);

        self.typing.remove(&client.username);
        self.broadcast_typing();
    }

    async fn handle_submit(&mut self, conn_id: ConnectionId, content: String, username: String) {
        if let Err(e) = validate_submission(&content, &username) {
            counter!(MESSAGE_REJECTED).increment(1);
            tracing::warn!("rejected message from '{username}': {e}");
            self.notify_error(conn_id, &e);
            return;
        }

        // server-assigned timestamp; client clocks are never trusted
        let message = ChatMessage {
            content,
            username: username.clone(),
            timestamp: Utc::now(),
        };

        if let Err(e) = self.storage.append_message(&message).await {
            tracing::error!("failed to persist message from '{username}': {e}");
            self.notify_error(conn_id, &e);
            return;
        }

        counter!(MESSAGE_ACCEPTED).increment(1);
        self.broadcast(message.into());

        // a sent message implicitly ends typing
        self.typing.remove(&username);
        self.broadcast_typing();
    }

    fn handle_typing_start(&mut self, username: String) {
        self.typing.insert(username);
        self.broadcast_typing();
    }

    fn handle_typing_end(&mut self, username: String) {
        self.typing.remove(&username);
        self.broadcast_typing();
    }

    fn broadcast_typing(&self) {
        let mut users: Vec<String> = self.typing.iter().cloned().collect();
        users.sort();
        self.broadcast(ServerEvent::TypingUpdate { users });
    }

    fn broadcast(&self, event: ServerEvent) {
        for (conn_id, client) in &self.connections {
            if client.tx.send(event.clone()).is_err() {
                tracing::warn!("failed to deliver event to connection {conn_id}");
            }
        }
    }

    fn notify_error(&self, conn_id: ConnectionId, error: &AppError) {
        if let Some(client) = self.connections.get(&conn_id) {
            let _ = client.tx.send(ServerEvent::Error {
                message: error.client_message(),
            });
        }
    }
}

fn validate_submission(content: &str, username: &str) -> Result<(), AppError> {
    if content.is_empty() || username.is_empty() {
        return Err(AppError::Validation(
            "Message content and username are required".to_string(),
        ));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(AppError::Validation(format!(
            "Message content exceeds {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(())
}

/// Spawn the room actor and return its handle
pub fn spawn_room(storage: impl MessageStore + 'static) -> RoomHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let actor = RoomActor::new(storage);

    tokio::spawn(actor.run(cmd_rx));

    RoomHandle { cmd_tx }
}
