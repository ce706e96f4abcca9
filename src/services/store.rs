//! Canvas store — durable, append-only list of placed items.
//!
//! DESIGN
//! ======
//! The wall is persisted as one whole-document snapshot, never as an
//! incremental log. Appending means: read the snapshot, build the new item
//! against it, push, and write the snapshot back.
//!
//! That read-modify-write spans two suspension points. Two unguarded
//! appends whose reads both land before either write lose one item: the
//! second write is built from a stale read. `CanvasStore` serializes appends
//! through a single async mutex, so placement always sees every previously
//! accepted item and no append is lost. `read_modify_write` is the bare
//! sequence without that guard.
//!
//! ERROR HANDLING
//! ==============
//! A failed write leaves the previous snapshot in place. `FileStore` writes a
//! sibling temp file and renames it over the document, so a crash mid-write
//! never leaves a torn file behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::state::CanvasItem;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is not valid json: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Whole-document snapshot persistence.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the full item list. A store that was never written reads as empty.
    async fn load(&self) -> Result<Vec<CanvasItem>, StoreError>;

    /// Replace the full item list.
    async fn save(&self, items: &[CanvasItem]) -> Result<(), StoreError>;
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON array document on local disk.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn load(&self) -> Result<Vec<CanvasItem>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, items: &[CanvasItem]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_vec(items)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), count = items.len(), "snapshot written");
        Ok(())
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local snapshot. Lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<Vec<CanvasItem>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Vec<CanvasItem>, StoreError> {
        Ok(self.items.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn save(&self, items: &[CanvasItem]) -> Result<(), StoreError> {
        *self.items.lock().unwrap_or_else(PoisonError::into_inner) = items.to_vec();
        Ok(())
    }
}

// =============================================================================
// CANVAS STORE
// =============================================================================

/// Snapshot store plus the append serialization point.
#[derive(Clone)]
pub struct CanvasStore {
    backend: Arc<dyn SnapshotStore>,
    append_lock: Arc<tokio::sync::Mutex<()>>,
}

impl CanvasStore {
    #[must_use]
    pub fn new(backend: Arc<dyn SnapshotStore>) -> Self {
        Self { backend, append_lock: Arc::new(tokio::sync::Mutex::new(())) }
    }

    /// Full persisted item list, in placement order.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the snapshot cannot be read.
    pub async fn items(&self) -> Result<Vec<CanvasItem>, StoreError> {
        self.backend.load().await
    }

    /// Append the item `build` produces from the current snapshot.
    ///
    /// Appends run one at a time, so `build` always sees every item that was
    /// accepted before it.
    ///
    /// # Errors
    ///
    /// Propagates `build`'s error, or a `StoreError` converted into `E`.
    pub async fn append_with<F, E>(&self, build: F) -> Result<CanvasItem, E>
    where
        F: FnOnce(&[CanvasItem]) -> Result<CanvasItem, E> + Send,
        E: From<StoreError> + Send,
    {
        let _guard = self.append_lock.lock().await;
        read_modify_write(self.backend.as_ref(), build).await
    }
}

/// Load, build, push, save. Not safe against concurrent callers on the same
/// backend: overlapping calls can drop an item.
pub(crate) async fn read_modify_write<F, E>(backend: &dyn SnapshotStore, build: F) -> Result<CanvasItem, E>
where
    F: FnOnce(&[CanvasItem]) -> Result<CanvasItem, E> + Send,
    E: From<StoreError> + Send,
{
    let mut items = backend.load().await?;
    let item = build(&items)?;
    items.push(item.clone());
    backend.save(&items).await?;
    info!(count = items.len(), "item appended");
    Ok(item)
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
