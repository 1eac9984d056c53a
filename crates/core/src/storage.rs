//! Filesystem-backed blob storage (generated images, uploaded logos).
//!
//! Files are addressed only by filename. [`LocalStorage`] maps a filename to
//! `{root}/{filename}` on disk and to `{url_prefix}{filename}` for static
//! serving. Writes go to a hidden temporary file first and are renamed into
//! place, so overwriting an existing file never leaves it half-written.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid filename '{0}'")]
    InvalidFilename(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error on '{filename}': {source}")]
    Io {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    fn io(filename: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(filename.to_string())
        } else {
            Self::Io {
                filename: filename.to_string(),
                source,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Public handle of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub url: String,
    pub filename: String,
}

/// Put/get/list/delete by filename.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Write `bytes` under `filename`, replacing any existing file.
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<StoredFile, StorageError>;

    /// Read the full contents of `filename`.
    async fn get(&self, filename: &str) -> Result<Vec<u8>, StorageError>;

    async fn exists(&self, filename: &str) -> Result<bool, StorageError>;

    /// Remove `filename`. Returns `false` if it did not exist.
    async fn delete(&self, filename: &str) -> Result<bool, StorageError>;

    /// All stored filenames, sorted.
    async fn list(&self) -> Result<Vec<String>, StorageError>;

    /// Public URL of `filename` (no existence check).
    fn url_for(&self, filename: &str) -> String;
}

// ---------------------------------------------------------------------------
// Filename validation
// ---------------------------------------------------------------------------

/// Reject names that could escape the storage root or hide from listings.
pub fn validate_filename(filename: &str) -> Result<(), StorageError> {
    let invalid = filename.is_empty()
        || filename.starts_with('.')
        || filename.contains(['/', '\\', '\0'])
        || filename.contains("..")
        || filename.len() > 255;

    if invalid {
        Err(StorageError::InvalidFilename(filename.to_string()))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LocalStorage
// ---------------------------------------------------------------------------

/// Blob storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    /// Open (creating if needed) a storage directory.
    ///
    /// `url_prefix` is normalized to end with `/`, e.g. `/images/`.
    pub async fn open(
        root: impl Into<PathBuf>,
        url_prefix: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::io(&root.display().to_string(), e))?;

        let mut url_prefix = url_prefix.into();
        if !url_prefix.ends_with('/') {
            url_prefix.push('/');
        }

        Ok(Self { root, url_prefix })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, StorageError> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }
}

#[async_trait]
impl BlobStorage for LocalStorage {
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<StoredFile, StorageError> {
        let path = self.path_for(filename)?;
        let tmp = self
            .root
            .join(format!(".{filename}.{}.tmp", uuid::Uuid::new_v4().simple()));

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StorageError::io(filename, e))?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::io(filename, e));
        }

        Ok(StoredFile {
            url: self.url_for(filename),
            filename: filename.to_string(),
        })
    }

    async fn get(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(filename)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::io(filename, e))
    }

    async fn exists(&self, filename: &str) -> Result<bool, StorageError> {
        let path = self.path_for(filename)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::io(filename, e))
    }

    async fn delete(&self, filename: &str) -> Result<bool, StorageError> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(filename, e)),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let root_name = self.root.display().to_string();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::io(&root_name, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&root_name, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    fn url_for(&self, filename: &str) -> String {
        format!("{}{filename}", self.url_prefix)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
