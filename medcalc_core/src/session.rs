//! Session-scoped key/value store with file locking.
//!
//! The presentation layer keeps the last computed results here between
//! invocations. Calculation modules never read or write this store; values
//! flow into them only as plain parameters.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Key under which the last BMI result is kept
pub const BMI_KEY: &str = "bmi";

/// Key under which the last dose result is kept
pub const DOSE_KEY: &str = "dose";

/// One user session's retained values
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionState {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    values: BTreeMap<String, serde_json::Value>,
}

impl Default for SessionState {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            updated_at: now,
            values: BTreeMap::new(),
        }
    }
}

impl SessionState {
    /// Fetch a value, deserializing it into `T`
    ///
    /// A stored value of the wrong shape is treated as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Ignoring session value {:?}: {}", key, e);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.values.insert(key.to_string(), value);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.values.remove(key).is_some();
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop all values and start a new session
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Load a session from a file with shared locking
    ///
    /// Returns a fresh session if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns a fresh session.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No session file found, starting new session");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    "Unable to open session file {:?}: {}. Starting new session.",
                    path,
                    e
                );
                return Ok(Self::default());
            }
        };

        // Acquire shared lock for reading
        if let Err(e) = file.lock_shared() {
            tracing::warn!(
                "Unable to lock session file {:?}: {}. Starting new session.",
                path,
                e
            );
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!(
                "Failed to read session file {:?}: {}. Starting new session.",
                path,
                e
            );
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<SessionState>(&contents) {
            Ok(state) => {
                tracing::debug!("Loaded session {} from {:?}", state.id, path);
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse session file {:?}: {}. Starting new session.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Save the session to a file
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    ///
    /// Writers that started from a loaded copy should go through `update`,
    /// which holds the session lock across load and save.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = parent_dir(path)?;
        std::fs::create_dir_all(parent)?;

        // Temp file in the same directory so the rename stays atomic
        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved session {} to {:?}", self.id, path);
        Ok(())
    }

    /// Load the session, modify it, and save it back
    ///
    /// An exclusive lock on the sidecar `.lock` file is held for the whole
    /// sequence, so concurrent updates to different keys are all kept.
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut SessionState) -> Result<()>,
    {
        std::fs::create_dir_all(parent_dir(path)?)?;

        let lock_file = lock_path(path);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_file)?;
        lock.lock_exclusive()?;
        tracing::debug!("Acquired session lock {:?}", lock_file);

        // Dropping `lock` on an early return releases it too
        let mut state = Self::load(path)?;
        f(&mut state)?;
        state.save(path)?;

        lock.unlock()?;
        Ok(state)
    }
}

/// Sidecar lock file guarding read-modify-write of `path`
pub fn lock_path(path: &Path) -> PathBuf {
    path.with_extension("lock")
}

fn parent_dir(path: &Path) -> Result<&Path> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| Error::Session(format!("session path {:?} has no parent", path)))
}
