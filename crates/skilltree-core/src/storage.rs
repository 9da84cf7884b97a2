//! Save blob storage.
//!
//! The manager never performs I/O on its own. Callers hand it a
//! [`SaveStore`] that files opaque blobs under a slot name and an owner.
//!
//! - [`MemorySaveStore`] keeps blobs in a map (tests, short-lived sessions).
//! - [`FileSaveStore`] writes `<root>/<slot>/<owner>.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use skilltree_types::OwnerId;

/// Errors from reading or writing saved blobs.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The slot name cannot be used as a storage key.
    #[error("invalid save slot name: {0:?}")]
    InvalidSlot(String),

    /// Filesystem failure.
    #[error("save storage I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Where save blobs live.
pub trait SaveStore {
    /// Store `blob` for `owner` in `slot`, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the slot is invalid or the write fails.
    fn write(&mut self, slot: &str, owner: OwnerId, blob: &[u8]) -> Result<(), StorageError>;

    /// Read the blob for `owner` in `slot`. `None` if nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the slot is invalid or the read fails.
    fn read(&self, slot: &str, owner: OwnerId) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove the blob for `owner` in `slot`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the slot is invalid or the removal fails.
    fn delete(&mut self, slot: &str, owner: OwnerId) -> Result<bool, StorageError>;
}

fn validate_slot(slot: &str) -> Result<(), StorageError> {
    let bad = slot.trim().is_empty()
        || slot == "."
        || slot == ".."
        || slot.contains(['/', '\\', '\0']);
    if bad {
        return Err(StorageError::InvalidSlot(slot.to_owned()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Blobs held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySaveStore {
    blobs: BTreeMap<(String, OwnerId), Vec<u8>>,
}

impl MemorySaveStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            blobs: BTreeMap::new(),
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl SaveStore for MemorySaveStore {
    fn write(&mut self, slot: &str, owner: OwnerId, blob: &[u8]) -> Result<(), StorageError> {
        validate_slot(slot)?;
        self.blobs.insert((slot.to_owned(), owner), blob.to_vec());
        Ok(())
    }

    fn read(&self, slot: &str, owner: OwnerId) -> Result<Option<Vec<u8>>, StorageError> {
        validate_slot(slot)?;
        Ok(self.blobs.get(&(slot.to_owned(), owner)).cloned())
    }

    fn delete(&mut self, slot: &str, owner: OwnerId) -> Result<bool, StorageError> {
        validate_slot(slot)?;
        Ok(self.blobs.remove(&(slot.to_owned(), owner)).is_some())
    }
}

// ---------------------------------------------------------------------------
// On disk
// ---------------------------------------------------------------------------

/// Blobs stored as files under a root directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous save intact.
#[derive(Debug, Clone)]
pub struct FileSaveStore {
    root: PathBuf,
}

impl FileSaveStore {
    /// Use `root` as the save directory. It is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The save directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, slot: &str, owner: OwnerId) -> Result<PathBuf, StorageError> {
        validate_slot(slot)?;
        Ok(self.root.join(slot).join(format!("{owner}.json")))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl SaveStore for FileSaveStore {
    fn write(&mut self, slot: &str, owner: OwnerId, blob: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(slot, owner)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        }
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, blob).map_err(|e| io_error(&staging, e))?;
        std::fs::rename(&staging, &path).map_err(|e| io_error(&path, e))?;
        tracing::debug!(%owner, slot, bytes = blob.len(), path = %path.display(), "Save written");
        Ok(())
    }

    fn read(&self, slot: &str, owner: OwnerId) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(slot, owner)?;
        match std::fs::read(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn delete(&mut self, slot: &str, owner: OwnerId) -> Result<bool, StorageError> {
        let path = self.path_for(slot, owner)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}
