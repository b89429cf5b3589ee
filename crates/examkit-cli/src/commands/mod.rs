//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use examkit_client::{load_config_from, AuthSession, ClientConfig, FileStore, HttpBackend, KeyValueStore, MemoryStore};

pub mod grade;
pub mod history;
pub mod init;
pub mod modules;
pub mod session;
pub mod take;
pub mod validate;

/// Load config and build an authenticated backend over the stored session.
pub(crate) fn connect(config_path: Option<PathBuf>) -> Result<(ClientConfig, Arc<HttpBackend>)> {
    let config = load_config_from(config_path.as_deref())?;
    tracing::debug!(?config, "using config");

    let store: Arc<dyn KeyValueStore> = match config.token_store_path() {
        Some(path) => Arc::new(FileStore::new(path)),
        None => {
            tracing::warn!("no home directory, the session will not be saved");
            Arc::new(MemoryStore::new())
        }
    };
    let session = Arc::new(AuthSession::new(store));
    let backend = HttpBackend::from_config(&config, session)?;
    Ok((config, Arc::new(backend)))
}

pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
