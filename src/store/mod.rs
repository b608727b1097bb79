//! File-backed persistence.
//!
//! The whole dataset lives in one JSON document. Every write goes through
//! [`Store::with_lock`], which holds the store's mutex across
//! load → mutate → save, so concurrent writers are strictly serialized.
//! Reads take the lock only while loading ([`Store::snapshot`]); a caller
//! acting on a snapshot may race with a later write.

pub mod models;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub use models::{Chirp, Database, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document is malformed: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode store document: {0}")]
    Encode(#[source] serde_json::Error),
}

pub struct Store {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document without taking the lock. A missing file yields an
    /// empty dataset.
    pub async fn load(&self) -> Result<Database, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no store document yet, starting empty");
                return Ok(Database::default());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(StoreError::Decode)
    }

    /// Replaces the document on disk. The new content is written to a sibling
    /// temp file first and renamed over the target.
    pub async fn save(&self, db: &Database) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(db).map_err(StoreError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &raw).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(
            path = %self.path.display(),
            chirps = db.chirps.len(),
            users = db.users.len(),
            "store saved"
        );
        Ok(())
    }

    /// Runs `f` against a freshly loaded document and persists the result.
    /// Nothing is written if `f` fails.
    pub async fn with_lock<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Database) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.lock().await;
        let mut db = self.load().await?;
        let out = f(&mut db)?;
        self.save(&db).await?;
        Ok(out)
    }

    /// Consistent read of the current document. The lock is released before
    /// this returns.
    pub async fn snapshot(&self) -> Result<Database, StoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Deletes the document so the next load starts empty.
    pub async fn reset(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "store document removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
