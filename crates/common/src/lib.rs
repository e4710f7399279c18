// ================
// crates/common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the Parlor client and server.
//! This module defines the WebSocket protocol events and the chat
//! message entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat message.
///
/// The timestamp is assigned by the server when the message is accepted,
/// never taken from the client. Once persisted a message is immutable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Message body, stored verbatim
    pub content: String,
    /// Display identity of the sender
    pub username: String,
    /// Server-assigned acceptance time
    pub timestamp: DateTime<Utc>,
}

/// Events sent from client to server over the WebSocket
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Submit a chat message to the room
    Message { content: String, username: String },
    /// The user began composing a message
    TypingStart { username: String },
    /// The user stopped composing without sending
    TypingEnd { username: String },
}

/// Events sent from server to client over the WebSocket
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// History window pushed to a newly attached connection only
    PreviousMessages { messages: Vec<ChatMessage> },
    /// A persisted message, fanned out to every connection
    Message {
        content: String,
        username: String,
        timestamp: DateTime<Utc>,
    },
    /// Full set of usernames currently typing, fanned out to every connection
    TypingUpdate { users: Vec<String> },
    /// Failure notice delivered to the originating connection only
    Error { message: String },
}

impl From<ChatMessage> for ServerEvent {
    fn from(message: ChatMessage) -> Self {
        ServerEvent::Message {
            content: message.content,
            username: message.username,
            timestamp: message.timestamp,
        }
    }
}
