//! src/services/storage_service.rs
//!
//! StorageService — the bucket and object lifecycle operations, backed by the
//! delimited-text catalogs in `catalog` and the payload files in `content`.
//! The lifecycle steps themselves live in `bucket_service` and
//! `object_service`; this file holds the shared state and the error type.

use crate::services::{
    catalog::CatalogStore, content::ContentStore, locks::CatalogLocks,
    name_validator::BucketNameError,
};
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

/// Storage settings handed to the catalog and content stores.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }
}

/// Coarse error classes; each maps to one HTTP status in `errors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Io,
    Format,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid bucket name `{name}`: {reason}")]
    InvalidBucketName {
        name: String,
        reason: BucketNameError,
    },
    #[error("invalid object key `{0}`")]
    InvalidObjectKey(String),
    #[error("invalid content type `{0}`")]
    InvalidContentType(String),
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("bucket `{0}` is not empty")]
    BucketNotEmpty(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("catalog {} corrupted at line {line}: {reason}", .path.display())]
    CatalogFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::InvalidBucketName { .. }
            | StorageError::InvalidObjectKey(_)
            | StorageError::InvalidContentType(_) => ErrorKind::Validation,
            StorageError::BucketNotFound(_) | StorageError::ObjectNotFound { .. } => {
                ErrorKind::NotFound
            }
            StorageError::BucketAlreadyExists(_) | StorageError::BucketNotEmpty(_) => {
                ErrorKind::Conflict
            }
            StorageError::CatalogFormat { .. } => ErrorKind::Format,
            StorageError::Io(_) => ErrorKind::Io,
        }
    }

    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::InvalidBucketName { .. } => "InvalidBucketName",
            StorageError::InvalidObjectKey(_) => "InvalidObjectKey",
            StorageError::InvalidContentType(_) => "InvalidContentType",
            StorageError::BucketNotFound(_) => "NoSuchBucket",
            StorageError::BucketAlreadyExists(_) => "BucketAlreadyExists",
            StorageError::BucketNotEmpty(_) => "BucketNotEmpty",
            StorageError::ObjectNotFound { .. } => "NoSuchKey",
            StorageError::CatalogFormat { .. } => "CatalogCorrupted",
            StorageError::Io(_) => "InternalError",
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// StorageService provides the bucket and object lifecycle:
/// - create / list / delete buckets
/// - put / get / head / list / delete objects
///
/// Cloning is cheap; all clones share the same stores and locks, which is
/// what makes the catalog locking effective across concurrent requests.
#[derive(Clone)]
pub struct StorageService {
    pub(crate) catalog: Arc<CatalogStore>,
    pub(crate) content: Arc<ContentStore>,
    pub(crate) locks: Arc<CatalogLocks>,
}

impl StorageService {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            catalog: Arc::new(CatalogStore::new(config)),
            content: Arc::new(ContentStore::new(config)),
            locks: Arc::new(CatalogLocks::default()),
        }
    }

    /// Prepare the data directory: create it and seed the bucket catalog.
    pub async fn init(&self) -> StorageResult<()> {
        self.catalog.init().await
    }
}
