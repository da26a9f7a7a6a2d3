use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use suraksha_core::{ClientConfig, FileTokenStore, Session, TokenStore};

/// Human-readable byte count ("10.0 KB").
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Token file configured for this client, if any.
pub fn token_store(config: &ClientConfig) -> Option<FileTokenStore> {
    config.token_file.as_ref().map(FileTokenStore::new)
}

/// Session for this invocation: `SURAKSHA_ACCESS_TOKEN` wins, then the token file.
pub fn load_session(config: &ClientConfig) -> anyhow::Result<Session> {
    if let Some(token) = &config.access_token {
        return Ok(Session::with_token(token.clone()));
    }
    match token_store(config) {
        Some(store) => Session::restore(&store).with_context(|| {
            format!(
                "Failed to load session from {} (run `suraksha logout` to reset it)",
                store.path().display()
            )
        }),
        None => Ok(Session::anonymous()),
    }
}

/// Remove the stored token without reading it, so an unreadable file is removed too.
pub fn clear_stored_token(config: &ClientConfig) -> anyhow::Result<Option<PathBuf>> {
    match token_store(config) {
        Some(store) => {
            store.clear()?;
            Ok(Some(store.path().to_path_buf()))
        }
        None => Ok(None),
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
