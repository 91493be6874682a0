//! Settings persistence.
//!
//! The core treats storage as an external key-value collaborator holding a
//! single record. Absent fields default on load (see [`Settings`]).

use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, StartPageError};
use crate::model::Settings;

pub trait SettingsStore: Send + Sync {
    /// Reads the stored record; `None` when nothing was ever saved
    fn get(&self) -> BoxFuture<'_, Result<Option<Settings>>>;

    /// Replaces the stored record
    fn set<'a>(&'a self, settings: &'a Settings) -> BoxFuture<'a, Result<()>>;
}

/// Stores the record as pretty-printed JSON in one file
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable record is moved before defaults are written
    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.corrupt")
    }

    async fn quarantine(&self, error: serde_json::Error) -> StartPageError {
        let backup = self.backup_path();
        match tokio::fs::rename(&self.path, &backup).await {
            Ok(()) => {
                warn!("⚠️  Unreadable settings moved to {:?}", backup);
                StartPageError::Quarantined {
                    backup,
                    reason: error.to_string(),
                }
            }
            Err(e) => {
                warn!("⚠️  Could not move unreadable settings aside: {}", e);
                StartPageError::Serde(error)
            }
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self) -> BoxFuture<'_, Result<Option<Settings>>> {
        Box::pin(async move {
            let content = match tokio::fs::read_to_string(&self.path).await {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("No settings file at {:?}, using defaults", self.path);
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };
            if content.trim().is_empty() {
                return Ok(None);
            }
            match serde_json::from_str::<Settings>(&content) {
                Ok(settings) => Ok(Some(settings)),
                Err(e) => Err(self.quarantine(e).await),
            }
        })
    }

    fn set<'a>(&'a self, settings: &'a Settings) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }

            // Write next to the target then rename, so a crash never leaves half a file
            let content = serde_json::to_string_pretty(settings)?;
            let tmp_path = self.path.with_extension("json.tmp");
            tokio::fs::write(&tmp_path, content).await?;
            tokio::fs::rename(&tmp_path, &self.path).await?;
            debug!("Settings written to {:?}", self.path);
            Ok(())
        })
    }
}

/// In-process store keeping the serialized record in memory.
///
/// Round-trips through JSON like the file store does. Writes can be made to
/// fail to exercise the storage-failure path.
#[derive(Default)]
pub struct MemoryStore {
    record: Mutex<Option<String>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `json` as the stored record, decoded only on `get`
    pub fn with_record(json: impl Into<String>) -> Self {
        Self {
            record: Mutex::new(Some(json.into())),
            ..Self::default()
        }
    }

    /// Raw stored record
    pub fn raw(&self) -> Option<String> {
        self.record.lock().ok().and_then(|record| record.clone())
    }

    /// Number of successful `set` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Last persisted record, decoded
    pub fn snapshot(&self) -> Result<Option<Settings>> {
        match self.lock_record()?.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn lock_record(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.record
            .lock()
            .map_err(|_| StartPageError::Storage("memory store poisoned".to_string()))
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self) -> BoxFuture<'_, Result<Option<Settings>>> {
        Box::pin(async move { self.snapshot() })
    }

    fn set<'a>(&'a self, settings: &'a Settings) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StartPageError::Storage("write rejected".to_string()));
            }
            let json = serde_json::to_string(settings)?;
            *self.lock_record()? = Some(json);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}
