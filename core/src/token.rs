//! Read access to the persisted session token.
//!
//! The token lives in client-local storage owned by the login flow: a JSON
//! object of string values, like browser local storage, under the key
//! `token`. This crate only reads it. Every failure to read degrades to "no
//! token" so an unauthenticated client can still be built.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Local-storage key holding the session token.
pub const TOKEN_KEY: &str = "token";

pub trait TokenStore: Send + Sync {
    /// Current token, or `None` when absent or unreadable. Empty strings
    /// count as absent.
    fn load(&self) -> Option<String>;
}

/// Token store backed by a JSON key/value file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no local storage file, continuing unauthenticated");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read local storage");
                return None;
            }
        };
        let entries: Map<String, Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "local storage is not a JSON object");
                return None;
            }
        };
        match entries.get(TOKEN_KEY) {
            Some(Value::String(token)) => non_empty(token.clone()),
            Some(other) => {
                warn!(path = %self.path.display(), kind = %json_kind(other), "token entry is not a string");
                None
            }
            None => None,
        }
    }
}

/// In-memory token store. Clones share the same slot, so a login flow can
/// hold one handle while the client reads through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    token: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: Arc::new(Mutex::new(token.map(str::to_string))),
        }
    }

    pub fn set(&self, token: &str) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }

    pub fn clear(&self) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        let token = self.token.lock().unwrap_or_else(PoisonError::into_inner).clone();
        token.and_then(non_empty)
    }
}

fn non_empty(token: String) -> Option<String> {
    if token.trim().is_empty() {
        None
    } else {
        Some(token)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn store_with(dir: &TempDir, name: &str, contents: &str) -> FileTokenStore {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        FileTokenStore::new(path)
    }

    #[test]
    fn reads_token_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, "valid.json", r#"{"token":"abc123","theme":"dark"}"#);
        assert_eq!(store.load().as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_file_means_no_token() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(FileTokenStore::new(dir.path().join("missing.json")).load(), None);
    }

    #[test]
    fn malformed_file_means_no_token() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store_with(&dir, "malformed.json", "token=abc").load(), None);
        assert_eq!(store_with(&dir, "number.json", r#"{"token":42}"#).load(), None);
    }

    #[test]
    fn empty_token_counts_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store_with(&dir, "empty.json", r#"{"token":""}"#).load(), None);
        assert_eq!(MemoryTokenStore::new(Some("  ")).load(), None);
    }

    #[test]
    fn memory_store_clones_share_the_slot() {
        let store = MemoryTokenStore::default();
        let reader = store.clone();
        assert_eq!(reader.load(), None);
        store.set("t1");
        assert_eq!(reader.load().as_deref(), Some("t1"));
        store.clear();
        assert_eq!(reader.load(), None);
    }
}
