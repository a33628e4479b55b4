use std::{fs, str::FromStr};

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    Sqlite,
    Memory,
}

impl FromStr for SessionBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(SessionBackend::Sqlite),
            "memory" => Ok(SessionBackend::Memory),
            other => bail!("unknown session backend '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub session_backend: SessionBackend,
    pub session_cookie: String,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/sessions.db".into(),
            session_backend: SessionBackend::Sqlite,
            session_cookie: "SESSION".into(),
            max_body_bytes: 16 * 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    database_url: Option<String>,
    session_backend: Option<SessionBackend>,
    session_cookie: Option<String>,
    max_body_bytes: Option<usize>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        if let Err(error) = apply_file_overrides(&mut settings, &raw) {
            warn!(%error, "ignoring unreadable server.toml");
        }
    }

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw).context("invalid server.toml")?;

    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.session_backend {
        settings.session_backend = v;
    }
    if let Some(v) = file_cfg.session_cookie {
        settings.session_cookie = v;
    }
    if let Some(v) = file_cfg.max_body_bytes {
        settings.max_body_bytes = v;
    }
    Ok(())
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = lookup("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = lookup("APP__SESSION_BACKEND") {
        match v.parse() {
            Ok(backend) => settings.session_backend = backend,
            Err(error) => warn!(%error, "ignoring APP__SESSION_BACKEND"),
        }
    }

    if let Some(v) = lookup("APP__SESSION_COOKIE") {
        if !v.trim().is_empty() {
            settings.session_cookie = v.trim().to_string();
        }
    }

    if let Some(v) = lookup("APP__MAX_BODY_BYTES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_body_bytes = parsed;
        }
    }
}

/// Accepts bare paths as well as sqlite URLs. Directories are left to the
/// store, which creates them when it opens the database.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
