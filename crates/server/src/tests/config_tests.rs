use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

#[test]
fn defaults_use_sqlite_sessions() {
    let settings = Settings::default();
    assert_eq!(settings.session_backend, SessionBackend::Sqlite);
    assert_eq!(settings.session_cookie, "SESSION");
}

#[test]
fn file_overrides_apply_known_keys() {
    let mut settings = Settings::default();
    apply_file_overrides(
        &mut settings,
        r#"
        bind_addr = "0.0.0.0:9000"
        session_backend = "memory"
        max_body_bytes = 1024
        "#,
    )
    .expect("parse");

    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.session_backend, SessionBackend::Memory);
    assert_eq!(settings.max_body_bytes, 1024);
    assert_eq!(settings.database_url, Settings::default().database_url);
}

#[test]
fn malformed_file_is_rejected() {
    let mut settings = Settings::default();
    assert!(apply_file_overrides(&mut settings, "bind_addr = [").is_err());
}

#[test]
fn app_prefixed_env_wins_over_plain_env() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        env_from(&[
            ("SERVER_BIND", "127.0.0.1:1"),
            ("APP__BIND_ADDR", "127.0.0.1:2"),
            ("DATABASE_URL", "sqlite://plain.db"),
        ]),
    );

    assert_eq!(settings.server_bind, "127.0.0.1:2");
    assert_eq!(settings.database_url, "sqlite://plain.db");
}

#[test]
fn invalid_env_values_keep_previous_settings() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        env_from(&[
            ("APP__SESSION_BACKEND", "redis"),
            ("APP__MAX_BODY_BYTES", "lots"),
            ("APP__SESSION_COOKIE", "  "),
        ]),
    );

    assert_eq!(settings.session_backend, SessionBackend::Sqlite);
    assert_eq!(settings.max_body_bytes, Settings::default().max_body_bytes);
    assert_eq!(settings.session_cookie, "SESSION");
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn keeps_memory_url_untouched() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[tokio::test]
async fn normalized_url_opens_store_in_missing_directory() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("tennis_server_test_{suffix}"));
    let db_path = temp_root.join("data").join("sessions.db");

    let database_url = normalize_database_url(db_path.to_string_lossy().as_ref());
    assert!(!temp_root.exists(), "normalizing must not touch the filesystem");

    let storage = storage::Storage::new(&database_url).await.expect("open sqlite");
    drop(storage);
    assert!(db_path.exists(), "database file should be created: {}", db_path.display());

    fs::remove_dir_all(temp_root).expect("cleanup");
}
