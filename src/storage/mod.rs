//! JSON-file key-value persistence.
//!
//! Dictionaries and user preferences are small, rarely written tables, so
//! they are persisted as individual JSON documents under a data directory:
//!
//! - `global_dict.json`: the process-lifetime replacement table
//! - `guild_dicts/<guild>.json`: one table per guild
//! - `user_prefs.json`: per-user speech preferences
//!
//! Writes go through a temporary file and an atomic rename so a crash never
//! leaves a half-written document behind. A missing document reads as the
//! type's default; a corrupt one is logged and also reads as default, since
//! losing a dictionary must never take the speech pipeline down with it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

/// Errors raised by the persistence layer.
///
/// Failed writes are always surfaced to the caller; the in-memory table the
/// write was about to replace stays untouched.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed
    #[error("store I/O failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    /// Serialization of the value failed
    #[error("store serialization failed for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// File-backed store keyed by relative document name (without extension).
///
/// Keys may contain `/` separators; intermediate directories are created on
/// demand.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Load the document at `key`, or the default value when it does not
    /// exist or cannot be parsed.
    pub fn load<T>(&self, key: &str) -> StoreResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.document_path(key);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                });
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key, error = %e, "store document is corrupt, falling back to default");
                Ok(T::default())
            }
        }
    }

    /// Persist `value` at `key`, replacing any previous document.
    pub fn save<T>(&self, key: &str, value: &T) -> StoreResult<()>
    where
        T: Serialize,
    {
        let path = self.document_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                key: key.to_string(),
                source,
            })?;
        }

        let raw = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;

        // Write-then-rename keeps the previous document intact on failure.
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::write(&tmp, raw).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)
    }

    /// Delete the document at `key`. Deleting a missing document is not an
    /// error.
    pub fn remove(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.document_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Whether a document exists at `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.document_path(key).exists()
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
