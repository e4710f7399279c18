// ============================
// parlor-backend-lib/src/auth/session.rs
// ============================
//! Session token handling and management.
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};
use dashmap::DashMap;
use metrics::{counter, gauge};
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use uuid::Uuid;

/// Session information
#[derive(Clone)]
pub struct Session {
    pub username: String,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

/// Session manager for handling authentication tokens
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<DashMap<String, Session>>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a new session manager and spawn its cleanup task
    pub fn new(ttl: Duration) -> Self {
        let manager = SessionManager {
            sessions: Arc::new(DashMap::new()),
            ttl,
        };

        let cleanup = manager.clone();
        tokio::spawn(async move {
            cleanup.cleanup_task().await;
        });

        manager
    }

    /// Create a new session and return its token
    pub fn create(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let now = SystemTime::now();
        self.sessions.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                created_at: now,
                expires_at: now + self.ttl,
            },
        );

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);

        token
    }

    /// Get a live session by token; expired sessions are treated as absent
    pub fn get(&self, token: &str) -> Option<Session> {
        let session = self.sessions.get(token)?.value().clone();
        if SystemTime::now() < session.expires_at {
            Some(session)
        } else {
            None
        }
    }

    /// Destroy a session, returning whether it existed
    pub fn destroy(&self, token: &str) -> bool {
        let removed = self.sessions.remove(token).is_some();
        if removed {
            gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);
        }
        removed
    }

    /// Cleanup task that runs periodically to remove expired sessions
    async fn cleanup_task(&self) {
        let cleanup_interval = Duration::from_secs(60 * 60); // 1 hour

        loop {
            tokio::time::sleep(cleanup_interval).await;

            let now = SystemTime::now();
            let before_count = self.sessions.len();
            self.sessions.retain(|_, session| now < session.expires_at);
            let removed = before_count - self.sessions.len();

            if removed > 0 {
                counter!(SESSION_EXPIRED).increment(removed as u64);
                gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_session() {
        let manager = SessionManager::new(Duration::from_secs(60));
        let token = manager.create("alice");

        let session = manager.get(&token).unwrap();
        assert_eq!(session.username, "alice");
        assert!(manager.get("no-such-token").is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_absent() {
        let manager = SessionManager::new(Duration::from_secs(0));
        let token = manager.create("alice");
        assert!(manager.get(&token).is_none());
    }

    #[tokio::test]
    async fn test_destroy_session() {
        let manager = SessionManager::new(Duration::from_secs(60));
        let token = manager.create("alice");

        assert!(manager.destroy(&token));
        assert!(manager.get(&token).is_none());
        assert!(!manager.destroy(&token));
    }
}
