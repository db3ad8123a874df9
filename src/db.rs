//! Credential store backed by SQLite.
//!
//! Accounts are a username plus a SHA-256 password hash. The store is only
//! consulted by the `register` and `login` commands; chat itself never
//! requires an account.

use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors from the credential store.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The underlying database failed.
    #[error("credential store error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handle to the account database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if necessary) the account database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                username   TEXT PRIMARY KEY,
                pass_hash  TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&pool)
        .await?;

        info!(path = %path.as_ref().display(), "Credential store ready");
        Ok(Self { pool })
    }

    /// Create an account. Returns false when the username is taken.
    pub async fn register(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("INSERT OR IGNORE INTO users (username, pass_hash) VALUES (?, ?)")
            .bind(username)
            .bind(hash_password(password))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Check credentials. Returns false for unknown users and wrong
    /// passwords alike.
    pub async fn verify(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let stored: Option<(String,)> =
            sqlx::query_as("SELECT pass_hash FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(stored.is_some_and(|(hash,)| hash == hash_password(password)))
    }
}

fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_temp() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("accounts.db")).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn test_register_then_verify() {
        let (db, _dir) = open_temp().await;

        assert!(db.register("alice", "hunter2").await.unwrap());
        assert!(db.verify("alice", "hunter2").await.unwrap());
        assert!(!db.verify("alice", "wrong").await.unwrap());
        assert!(!db.verify("nobody", "hunter2").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let (db, _dir) = open_temp().await;

        assert!(db.register("bob", "first").await.unwrap());
        assert!(!db.register("bob", "second").await.unwrap());
        // Original password still in force.
        assert!(db.verify("bob", "first").await.unwrap());
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let h = hash_password("hunter2");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, hash_password("hunter2"));
        assert_ne!(h, hash_password("Hunter2"));
    }
}
