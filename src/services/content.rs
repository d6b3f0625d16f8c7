//! Object content store.
//!
//! Object payloads are plain files at `<data_dir>/<bucket>/<key>`, where the
//! key's `/` separators become nested directories. Uploads stream into a
//! temporary file beside the target and are renamed into place, so a reader
//! never observes a half-written payload.
//!
//! Deleting a payload prunes the directories it leaves empty. Pruning and
//! temp-file creation share a per-bucket directory lock, so a prune never
//! removes a directory a concurrent upload has just created for its temp
//! file. That lock is innermost: nothing else is acquired while holding it.

use crate::services::{
    locks::KeyedLocks,
    storage_service::{StorageConfig, StorageError, StorageResult},
};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

/// Outcome of a completed content write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenContent {
    pub content_length: u64,
    /// Lowercase hex MD5 of the payload.
    pub etag: String,
}

#[derive(Debug)]
pub struct ContentStore {
    data_dir: PathBuf,
    dir_locks: KeyedLocks,
}

impl ContentStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            dir_locks: KeyedLocks::default(),
        }
    }

    /// Directory holding a bucket's catalog and payloads.
    pub fn bucket_root(&self, bucket: &str) -> PathBuf {
        self.data_dir.join(bucket)
    }

    /// Payload path for `key`; each `/`-separated segment becomes a path
    /// component.
    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.bucket_root(bucket);
        path.extend(key.split('/'));
        path
    }

    pub async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        match fs::metadata(self.bucket_root(bucket)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// True unless something other than a directory sits at the bucket's
    /// path.
    pub async fn bucket_path_available(&self, bucket: &str) -> StorageResult<bool> {
        match fs::metadata(self.bucket_root(bucket)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(true),
            Err(err) => Err(err.into()),
        }
    }

    /// Create the bucket directory. An existing directory is fine; a plain
    /// file at that path is reported as `BucketAlreadyExists`.
    pub async fn create_bucket_dir(&self, bucket: &str) -> StorageResult<()> {
        match fs::create_dir_all(self.bucket_root(bucket)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::BucketAlreadyExists(bucket.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Recursively remove the bucket directory. A missing directory is fine.
    pub async fn remove_bucket_dir(&self, bucket: &str) -> StorageResult<()> {
        match fs::remove_dir_all(self.bucket_root(bucket)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn content_exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        match fs::metadata(self.object_path(bucket, key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Stream a payload to disk, replacing any previous content for `key`.
    ///
    /// - Creates intermediate directories for nested keys.
    /// - Writes to a temporary file, fsyncs, then renames into place.
    /// - Computes the byte count and MD5 while streaming.
    ///
    /// The temporary file is removed on any error.
    pub async fn write_content<S>(
        &self,
        bucket: &str,
        key: &str,
        stream: S,
    ) -> StorageResult<WrittenContent>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let file_path = self.object_path(bucket, key);
        let (tmp_path, tmp_file) = self.create_temp_file(bucket, &file_path).await?;

        match stream_to_file(tmp_file, stream).await {
            Ok(written) => {
                if let Err(err) = fs::rename(&tmp_path, &file_path).await {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StorageError::Io(err));
                }
                debug!(
                    "stored {} bytes at {}",
                    written.content_length,
                    file_path.display()
                );
                Ok(written)
            }
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                Err(StorageError::Io(err))
            }
        }
    }

    /// Open a payload for streaming out.
    pub async fn read_content(&self, bucket: &str, key: &str) -> StorageResult<File> {
        File::open(self.object_path(bucket, key))
            .await
            .map_err(|err| not_found_or_io(err, bucket, key))
    }

    /// Remove a payload and prune directories its key left empty.
    pub async fn delete_content(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let file_path = self.object_path(bucket, key);
        fs::remove_file(&file_path)
            .await
            .map_err(|err| not_found_or_io(err, bucket, key))?;
        debug!("removed payload {}", file_path.display());

        self.prune_empty_dirs(bucket, &file_path).await;
        Ok(())
    }

    /// Create the payload's directory and a uniquely named temp file in it.
    ///
    /// Both happen under the bucket's directory lock; once the temp file
    /// exists the directory is no longer empty and pruning leaves it alone.
    async fn create_temp_file(
        &self,
        bucket: &str,
        file_path: &Path,
    ) -> StorageResult<(PathBuf, File)> {
        let parent = file_path.parent().ok_or_else(|| {
            StorageError::Io(io::Error::other("object path missing parent directory"))
        })?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let _dirs_guard = self.dir_locks.lock(bucket).await;
        fs::create_dir_all(parent).await?;
        let file = File::create(&tmp_path).await?;
        Ok((tmp_path, file))
    }

    /// Remove the directories between `file_path` and the bucket root that
    /// are now empty, deepest first. The bucket root itself is kept.
    async fn prune_empty_dirs(&self, bucket: &str, file_path: &Path) {
        let root = self.bucket_root(bucket);
        let _dirs_guard = self.dir_locks.lock(bucket).await;

        for dir in file_path
            .ancestors()
            .skip(1)
            .take_while(|dir| dir.starts_with(&root) && *dir != root)
        {
            match fs::remove_dir(dir).await {
                Ok(()) => debug!("pruned empty directory {}", dir.display()),
                Err(err) => {
                    if !matches!(
                        err.kind(),
                        ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty
                    ) {
                        debug!("stopped pruning at {}: {}", dir.display(), err);
                    }
                    break;
                }
            }
        }
    }
}

async fn stream_to_file<S>(mut file: File, stream: S) -> io::Result<WrittenContent>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut content_length: u64 = 0;
    let mut digest = Context::new();

    pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        content_length += chunk.len() as u64;
        digest.consume(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;

    Ok(WrittenContent {
        content_length,
        etag: format!("{:x}", digest.compute()),
    })
}

fn not_found_or_io(err: io::Error, bucket: &str, key: &str) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    } else {
        StorageError::Io(err)
    }
}
