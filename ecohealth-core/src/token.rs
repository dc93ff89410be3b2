//! Persisted bearer token.
//!
//! The token is the only state shared by all bindings. It is read and
//! written synchronously and stored under a single fixed key.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

use crate::error::{PortalError, PortalResult};

pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;

    fn set(&self, token: &str) -> PortalResult<()>;

    fn clear(&self) -> PortalResult<()>;

    fn has_token(&self) -> bool {
        self.get().is_some_and(|t| !t.is_empty())
    }
}

/// Process-local token slot, used by tests and short-lived embeddings.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        match self.slot.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, token: &str) -> PortalResult<()> {
        let mut slot = self
            .slot
            .write()
            .map_err(|e| PortalError::TokenStorage(e.to_string()))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> PortalResult<()> {
        let mut slot = self
            .slot
            .write()
            .map_err(|e| PortalError::TokenStorage(e.to_string()))?;
        *slot = None;
        Ok(())
    }
}

/// JSON file of string keys, the token living under `key`.
///
/// Other keys in the file are preserved across writes.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> PortalResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(entries) => Ok(entries),
            _ => Err(PortalError::TokenStorage(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> PortalResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        match self.read_entries() {
            Ok(entries) => entries
                .get(&self.key)
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                debug!(path = %self.path.display(), "Unreadable token file: {}", e);
                None
            }
        }
    }

    fn set(&self, token: &str) -> PortalResult<()> {
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(self.key.clone(), Value::String(token.to_string()));
        self.write_entries(&entries)
    }

    fn clear(&self) -> PortalResult<()> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(_) => Map::new(),
        };
        if entries.remove(&self.key).is_none() && !self.path.exists() {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}
