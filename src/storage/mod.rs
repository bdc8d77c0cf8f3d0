//! Durable state: the previous snapshot and the notification ledger
//!
//! Both stores are injected into the diff engine. File stores replace
//! their target atomically by writing `<path>.tmp` and renaming it.

mod ledger;
#[cfg(test)]
mod tests;

pub use ledger::{Ledger, LedgerEntry, UNKNOWN_LINK};

use crate::error::PersistenceError;
use crate::types::Snapshot;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub type StoreResult<T> = std::result::Result<T, PersistenceError>;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Previous cycle's matches; absent state is an empty snapshot
    async fn load(&self) -> StoreResult<Snapshot>;

    async fn save(&self, snapshot: &Snapshot) -> StoreResult<()>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Stored ledger; absent state is an empty ledger
    async fn load(&self) -> StoreResult<Ledger>;

    async fn save(&self, ledger: &Ledger) -> StoreResult<()>;
}

/// Snapshot persisted as a pretty-printed JSON array of matches
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> StoreResult<Snapshot> {
        let Some(text) = read_optional(&self.path).await? else {
            return Ok(Snapshot::new());
        };
        if text.trim().is_empty() {
            return Ok(Snapshot::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            PersistenceError::Parse(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let text = serde_json::to_string_pretty(snapshot)
            .map_err(|e| PersistenceError::Parse(e.to_string()))?;
        write_atomic(&self.path, text.as_bytes()).await?;
        debug!("Saved snapshot of {} matches to {}", snapshot.len(), self.path.display());
        Ok(())
    }
}

/// Ledger persisted as `timestamp|title|link` lines
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn load(&self) -> StoreResult<Ledger> {
        Ok(read_optional(&self.path)
            .await?
            .map(|text| Ledger::parse_lines(&text))
            .unwrap_or_default())
    }

    async fn save(&self, ledger: &Ledger) -> StoreResult<()> {
        write_atomic(&self.path, ledger.to_lines().as_bytes()).await?;
        debug!("Saved ledger of {} entries to {}", ledger.len(), self.path.display());
        Ok(())
    }
}

async fn read_optional(path: &Path) -> StoreResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PersistenceError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write to a sibling temp file and rename it over the target
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let write_err = |source: std::io::Error| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)
}
