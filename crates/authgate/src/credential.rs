// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer credential storage.
//!
//! The store owns the single current token. Reads come from an in-memory
//! cache and never touch the disk; writes update the cache first and then
//! persist, so a failed persist never hides the new value from readers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "auth_token";

/// File name of the persisted credentials inside the state directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Durable holder of the current bearer token.
///
/// Implementations must make `set`/`clear` visible to the next `get`
/// immediately. Last write wins.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str);
    fn clear(&self);

    fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}

/// Resolve the state directory for persisted credentials.
///
/// Checks `AUTHGATE_STATE_DIR`, then `$XDG_STATE_HOME/authgate`,
/// then `$HOME/.local/state/authgate`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AUTHGATE_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("authgate");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/authgate");
    }
    PathBuf::from(".authgate")
}

/// Default credentials file path.
pub fn default_path() -> PathBuf {
    state_dir().join(CREDENTIALS_FILE)
}

/// On-disk shape: a flat map of fixed keys to opaque strings.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct PersistedCredentials {
    #[serde(flatten)]
    entries: BTreeMap<String, String>,
}

/// Credential store backed by a JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
    token: RwLock<Option<String>>,
    /// Serializes writers so the file always ends at the last cached value.
    /// Held across disk I/O; `token` never is.
    persist_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading any persisted token.
    ///
    /// A missing or unreadable file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let token = load(&path);
        if token.is_some() {
            debug!(path = %path.display(), "loaded persisted credential");
        }
        Self { path, token: RwLock::new(token), persist_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, token: Option<&str>) {
        let mut persisted = PersistedCredentials::default();
        if let Some(token) = token {
            persisted.entries.insert(TOKEN_KEY.to_owned(), token.to_owned());
        }
        if let Err(e) = save(&self.path, &persisted) {
            warn!(path = %self.path.display(), err = %e, "failed to persist credential");
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set(&self, token: &str) {
        let _persist = self.persist_lock.lock();
        *self.token.write() = Some(token.to_owned());
        self.persist(Some(token));
        debug!(path = %self.path.display(), "stored credential");
    }

    fn clear(&self) {
        let _persist = self.persist_lock.lock();
        *self.token.write() = None;
        self.persist(None);
        info!(path = %self.path.display(), "cleared credential");
    }
}

/// Non-durable store, for tests and one-shot use.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: RwLock::new(Some(token.into())) }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set(&self, token: &str) {
        *self.token.write() = Some(token.to_owned());
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}

fn load(path: &Path) -> Option<String> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), "failed to read credentials: {e}");
            return None;
        }
    };
    let persisted: PersistedCredentials = match serde_json::from_str(&data) {
        Ok(p) => p,
        Err(e) => {
            warn!(path = %path.display(), "failed to parse credentials: {e}");
            return None;
        }
    };
    persisted.entries.get(TOKEN_KEY).filter(|t| !t.is_empty()).cloned()
}

/// Write credentials atomically (unique tmp file + rename).
///
/// The tmp name carries the PID and a counter so concurrent writers never
/// share a tmp file.
fn save(path: &Path, creds: &PersistedCredentials) -> anyhow::Result<()> {
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(creds)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
