use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::SessionId;

mod memory;

pub use memory::MemorySessionStore;

/// Per-session key/value storage. Every call is atomic on its own; callers
/// that read, modify and write back get no isolation across those calls.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: SessionId, key: &str) -> Result<Option<serde_json::Value>>;
    async fn put(&self, session_id: SessionId, key: &str, value: serde_json::Value) -> Result<()>;
    async fn remove(&self, session_id: SessionId, key: &str) -> Result<bool>;
    async fn health_check(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct StoredSessionEntry {
    pub session_id: SessionId,
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// All entries stored under `key`, most recently written first.
    pub async fn list_entries(&self, key: &str) -> Result<Vec<StoredSessionEntry>> {
        let rows = sqlx::query(
            "SELECT session_id, entry_key, value_json, updated_at
             FROM session_entries
             WHERE entry_key = ?
             ORDER BY updated_at DESC, session_id ASC",
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let raw_session = r.get::<String, _>(0);
                let session_id = raw_session
                    .parse::<SessionId>()
                    .with_context(|| format!("invalid session id '{raw_session}' in store"))?;
                let raw_value = r.get::<String, _>(2);
                let value = serde_json::from_str(&raw_value)
                    .with_context(|| format!("invalid json stored for session {session_id}"))?;
                Ok(StoredSessionEntry {
                    session_id,
                    key: r.get::<String, _>(1),
                    value,
                    updated_at: r.get::<DateTime<Utc>, _>(3),
                })
            })
            .collect()
    }

    /// Drops every entry stored for `session_id`, whatever its key.
    pub async fn clear_session(&self, session_id: SessionId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM session_entries WHERE session_id = ?")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for Storage {
    async fn get(&self, session_id: SessionId, key: &str) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query(
            "SELECT value_json FROM session_entries WHERE session_id = ? AND entry_key = ?",
        )
        .bind(session_id.to_string())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .context("failed loading session entry")?;

        row.map(|r| {
            let raw = r.get::<String, _>(0);
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid json stored for session {session_id}"))
        })
        .transpose()
    }

    async fn put(&self, session_id: SessionId, key: &str, value: serde_json::Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_entries (session_id, entry_key, value_json, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(session_id, entry_key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
        )
        .bind(session_id.to_string())
        .bind(key)
        .bind(value.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("failed writing session entry")?;
        Ok(())
    }

    async fn remove(&self, session_id: SessionId, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM session_entries WHERE session_id = ? AND entry_key = ?")
            .bind(session_id.to_string())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
