use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A persisted string value and when it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredValue {
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Small local key–value storage scoped to one user profile.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<StoredValue>;

    fn set(&self, key: &str, value: String) -> Result<()>;
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.lock().insert(
            key.to_string(),
            StoredValue {
                value,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// Key–value store backed by a JSON file, rewritten on every `set`.
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl FileKvStore {
    /// Open the store at `path`. A missing file yields an empty store; a
    /// corrupt one is logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read store file: {}", path.display()))?;
            match serde_json::from_str(&json) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), "corrupt store file, starting empty: {e}");
                    HashMap::new()
                }
            }
        } else {
            info!(path = %path.display(), "store file not found, starting empty");
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &HashMap<String, StoredValue>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(entries).context("failed to serialize store")?;
        std::fs::write(&self.path, json).context("failed to write store file")?;

        // Owner-only (0o600 = rw-------).
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .context("failed to set store file permissions")?;
        }
        Ok(())
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(
            key.to_string(),
            StoredValue {
                value,
                updated_at: Utc::now(),
            },
        );
        self.save(&entries)
    }
}
