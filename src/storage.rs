// src/storage.rs

use std::{fmt, io, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::models::upload::UploadedFile;

/// URL prefix under which stored files are served.
pub const PUBLIC_PREFIX: &str = "/storage";

pub const AVATAR_FOLDER: &str = "avatars";
pub const POST_IMAGE_FOLDER: &str = "posts";

#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    /// The reference does not point inside the public storage area.
    InvalidReference(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "storage I/O error: {}", err),
            StorageError::InvalidReference(r) => write!(f, "not a stored file reference: {}", r),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

/// Contract for the blob store holding avatars and post images.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persists `file` under `folder` and returns its public URL.
    async fn store(&self, folder: &str, file: &UploadedFile) -> Result<String, StorageError>;

    /// Removes the file behind a URL previously returned by `store`.
    /// Deleting a file that is already gone succeeds.
    async fn delete(&self, url: &str) -> Result<(), StorageError>;
}

pub type StorageState = Arc<dyn FileStorage>;

/// Stores files on the local disk; the router serves `root` at [`PUBLIC_PREFIX`].
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a public URL (relative or absolute) to a path under `root`.
    pub fn path_for(&self, url: &str) -> Option<PathBuf> {
        relative_key(url).map(|key| self.root.join(key))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn store(&self, folder: &str, file: &UploadedFile) -> Result<String, StorageError> {
        let folder = sanitize_key(folder);
        let name = format!("{}.{}", Uuid::new_v4(), file.extension());

        let dir = self.root.join(&folder);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), &file.bytes).await?;

        Ok(format!("{}/{}/{}", PUBLIC_PREFIX, folder, name))
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let path = self
            .path_for(url)
            .ok_or_else(|| StorageError::InvalidReference(url.to_string()))?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Strips the public prefix (and host, for absolute URLs) from a stored reference.
fn relative_key(reference: &str) -> Option<String> {
    let path = match Url::parse(reference) {
        Ok(url) => url.path().to_string(),
        Err(_) => reference.to_string(),
    };

    let key = sanitize_key(path.strip_prefix(PUBLIC_PREFIX)?);
    (!key.is_empty()).then_some(key)
}

/// Removes directory navigation components (`..`, `.`) and empty segments.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}
