// ============================
// parlor-backend-lib/src/storage.rs
// ============================
//! Message store abstraction with flat-file implementation.
use crate::error::AppError;
use async_trait::async_trait;
use parlor_common::ChatMessage;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokio::{fs as tokio_fs, io::AsyncWriteExt};

/// Number of messages pushed to a newly attached connection
pub const HISTORY_LIMIT: usize = 50;

/// Trait for message store backends
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a single message
    async fn append_message(&self, message: &ChatMessage) -> Result<(), AppError>;

    /// Read the most recent `limit` messages in chronological order
    async fn recent_messages(&self, limit: usize) -> Result<Vec<ChatMessage>, AppError>;
}

/// Flat-file implementation of the `MessageStore` trait
#[derive(Clone)]
pub struct FlatFileStorage {
    root: PathBuf,
}

impl FlatFileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn log_path(&self) -> PathBuf {
        self.root.join("messages.log")
    }
}

#[async_trait]
impl MessageStore for FlatFileStorage {
    /// Append a JSON line to `messages.log`.
    async fn append_message(&self, message: &ChatMessage) -> Result<(), AppError> {
        let json = serde_json::to_string(message)?;

        let mut file = tokio_fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }

    /// Read the tail of `messages.log`. Blank or unparsable lines are
    /// skipped rather than failing the whole read.
    async fn recent_messages(&self, limit: usize) -> Result<Vec<ChatMessage>, AppError> {
        let path = self.log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = tokio_fs::read_to_string(&path).await?;
        let mut messages: Vec<ChatMessage> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn message(content: &str, username: &str) -> ChatMessage {
        ChatMessage {
            content: content.to_string(),
            username: username.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_append_and_read_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FlatFileStorage::new(temp_dir.path()).unwrap();

        let first = message("hello", "alice");
        let second = message("hi alice", "bob");
        storage.append_message(&first).await.unwrap();
        storage.append_message(&second).await.unwrap();

        let messages = storage.recent_messages(HISTORY_LIMIT).await.unwrap();
        assert_eq!(messages, vec![first, second]);
    }

    #[tokio::test]
    async fn test_recent_messages_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FlatFileStorage::new(temp_dir.path()).unwrap();

        let messages = storage.recent_messages(HISTORY_LIMIT).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_recent_messages_returns_tail_window() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FlatFileStorage::new(temp_dir.path()).unwrap();

        for i in 0..5 {
            storage
                .append_message(&message(&format!("msg-{i}"), "alice"))
                .await
                .unwrap();
        }

        let messages = storage.recent_messages(3).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "msg-2");
        assert_eq!(messages[2].content, "msg-4");
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FlatFileStorage::new(temp_dir.path()).unwrap();

        storage.append_message(&message("ok", "alice")).await.unwrap();
        tokio::fs::OpenOptions::new()
            .append(true)
            .open(storage.log_path())
            .await
            .unwrap()
            .write_all(b"not json\n")
            .await
            .unwrap();
        storage.append_message(&message("also ok", "bob")).await.unwrap();

        let messages = storage.recent_messages(HISTORY_LIMIT).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "ok");
        assert_eq!(messages[1].content, "also ok");
    }
}
