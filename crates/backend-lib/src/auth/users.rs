// ============================
// parlor-backend-lib/src/auth/users.rs
// ============================
//! Flat-file user account store.
use crate::auth::password;
use crate::error::AppError;
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tokio::{fs as tokio_fs, sync::Mutex};

/// User store keeping `username -> password hash` in memory, persisted
/// as `users.json` under the data directory.
pub struct UserStore {
    path: PathBuf,
    users: RwLock<HashMap<String, String>>,
    // held across the insert-and-persist pair so snapshots reach disk in
    // insert order
    write_lock: Mutex<()>,
}

impl UserStore {
    /// Load the store from the data directory, starting empty if no
    /// `users.json` exists yet.
    pub fn load<P: AsRef<Path>>(data_dir: P) -> anyhow::Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join("users.json");

        let users = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            users: RwLock::new(users),
            write_lock: Mutex::new(()),
        })
    }

    /// Register a new user. Fails if the username is taken.
    pub async fn register(&self, username: &str, plain_password: &str) -> Result<(), AppError> {
        if username.is_empty() || plain_password.is_empty() {
            return Err(AppError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let hash = password::hash_password(plain_password)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let _guard = self.write_lock.lock().await;
        let snapshot = {
            let mut users = self.users.write();
            if users.contains_key(username) {
                return Err(AppError::UsernameTaken);
            }
            users.insert(username.to_string(), hash);
            users.clone()
        };

        self.persist(&snapshot).await
    }

    /// Check a username/password pair against the stored hash
    pub fn verify(&self, username: &str, plain_password: &str) -> Result<(), AppError> {
        let users = self.users.read();
        let hash = users.get(username).ok_or(AppError::InvalidCredentials)?;
        if password::verify_password(hash, plain_password) {
            Ok(())
        } else {
            Err(AppError::InvalidCredentials)
        }
    }

    /// Write through a temp file and rename, so a crash mid-write never
    /// leaves a truncated `users.json` behind.
    async fn persist(&self, users: &HashMap<String, String>) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(users)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio_fs::write(&tmp, json).await?;
        tokio_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
