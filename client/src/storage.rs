//! Durable token storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session manager is the only writer. Storage is best-effort in the same
//! way browser `localStorage` is: failures are logged and swallowed, and a
//! missing or unreadable value reads as "no token".

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A single-key string slot holding the bearer token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str);
    fn clear(&self);
}

/// Process-local store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { slot: Mutex::new(Some(token.into())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.as_ref().cloned())
    }

    fn save(&self, token: &str) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(token.to_owned());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

/// JSON object on disk; the token lives under one key so the file can hold
/// other client preferences alongside it.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self { path: path.into(), key: key.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> BTreeMap<String, serde_json::Value> {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "token file unreadable, ignoring");
            BTreeMap::new()
        })
    }

    fn write_map(&self, map: &BTreeMap<String, serde_json::Value>) {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            tracing::warn!(path = %parent.display(), error = %e, "failed to create token directory");
            return;
        }
        let raw = match serde_json::to_string_pretty(map) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode token file");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, raw) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write token file");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        self.read_map()
            .get(&self.key)
            .and_then(serde_json::Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
    }

    fn save(&self, token: &str) {
        let mut map = self.read_map();
        map.insert(self.key.clone(), serde_json::Value::String(token.to_owned()));
        self.write_map(&map);
    }

    fn clear(&self) {
        let mut map = self.read_map();
        if map.remove(&self.key).is_some() {
            self.write_map(&map);
        }
    }
}
