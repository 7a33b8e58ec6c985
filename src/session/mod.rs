//! Session store for interactively collected values.
//!
//! Values supplied for `{{:name}}` placeholders are remembered per endpoint so
//! the user is asked only once. Entries are keyed by
//! [`generate_key`](crate::variables::user_input::generate_key) of the request
//! URL and persisted as pretty-printed JSON:
//!
//! ```json
//! {
//!   "api.example.com/users/?page=1": { "id": "42", "limit": 10 }
//! }
//! ```

use crate::models::Value;
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or writing the session file.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("session file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("session store has no backing file")]
    NoPath,
}

/// Collected user-input values, grouped by endpoint key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInputStore {
    entries: BTreeMap<String, BTreeMap<String, Value>>,
    path: Option<PathBuf>,
}

impl UserInputStore {
    /// Creates an empty, in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the store backed by `path`. A missing file yields an empty store
    /// that will be created on the first [`save`](Self::save).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no session file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the stored value for `name` under `key`, rendered as text.
    pub fn get(&self, key: &str, name: &str) -> Option<String> {
        self.entries
            .get(key)
            .and_then(|values| values.get(name))
            .map(Value::to_string)
    }

    pub fn set(&mut self, key: impl Into<String>, name: impl Into<String>, value: impl Into<Value>) {
        self.entries
            .entry(key.into())
            .or_default()
            .insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the store back to the file it was opened from.
    pub fn save(&self) -> Result<(), SessionError> {
        let path = self.path.as_deref().ok_or(SessionError::NoPath)?;
        self.save_to(path)
    }

    /// Writes the store to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, json)?;
        debug!("saved session values to {}", path.display());
        Ok(())
    }
}
