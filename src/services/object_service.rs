//! Object lifecycle: put, get, head, list and delete.
//!
//! The object catalog is authoritative for visibility. Puts write content
//! first and record it in the catalog afterwards; deletes drop the catalog
//! entry first and remove content afterwards. Either way an interrupted
//! operation can only leave an unreferenced payload behind, which clients
//! never see. A catalog entry whose payload has gone missing is reported as
//! not found.

use crate::{
    models::object::{Object, resolve_content_type},
    services::{
        catalog::{OBJECTS_FILE, is_storable_field},
        name_validator::validate_bucket_name,
        storage_service::{StorageError, StorageResult, StorageService},
    },
};
use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use std::io::{self, ErrorKind};
use tokio::fs::File;
use tracing::{info, warn};

const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Result of a successful put.
#[derive(Debug, Clone)]
pub struct PutObjectOutput {
    pub object: Object,
    /// Lowercase hex MD5 of the stored payload.
    pub etag: String,
}

impl StorageService {
    /// Store an object, replacing any existing object with the same key.
    ///
    /// Writers of the same key are serialized, so the catalog always
    /// describes the payload that was written last.
    ///
    /// If the catalog update fails, a payload for a new key is removed again.
    /// An overwritten payload is kept, because the key's existing entry
    /// still refers to it.
    pub async fn put_object<S>(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        stream: S,
    ) -> StorageResult<PutObjectOutput>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        ensure_key_safe(key)?;
        let content_type = resolve_content_type(content_type);
        if !is_storable_field(&content_type) {
            return Err(StorageError::InvalidContentType(content_type));
        }
        self.ensure_bucket(bucket).await?;

        let _key_guard = self.locks.object_key(bucket, key).await;
        // stable until the catalog update: every writer of this key holds the key lock
        let replacing = match self.lookup_object(bucket, key).await {
            Ok(_) => true,
            Err(StorageError::ObjectNotFound { .. }) => false,
            Err(err) => return Err(err),
        };
        let written = self.content.write_content(bucket, key, stream).await?;

        let object = Object {
            key: key.to_string(),
            content_type,
            content_length: written.content_length,
            last_modified: Utc::now(),
        };

        if let Err(err) = self.record_object(bucket, object.clone()).await {
            if replacing {
                warn!(
                    "catalog entry {}/{} not updated, keeping the new payload",
                    bucket, key
                );
            } else if let Err(cleanup) = self.content.delete_content(bucket, key).await {
                warn!(
                    "failed to remove unrecorded payload {}/{}: {}",
                    bucket, key, cleanup
                );
            }
            return Err(err);
        }

        info!(
            "object {}/{} stored ({} bytes, {})",
            bucket, key, object.content_length, object.content_type
        );
        Ok(PutObjectOutput {
            object,
            etag: written.etag,
        })
    }

    /// Catalog record plus an open handle on the payload, for streaming out.
    pub async fn get_object_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<(Object, File)> {
        ensure_key_safe(key)?;
        self.ensure_bucket(bucket).await?;
        let object = self.lookup_object(bucket, key).await?;
        let file = self.content.read_content(bucket, key).await.map_err(|err| {
            if matches!(err, StorageError::ObjectNotFound { .. }) {
                warn!("catalog entry {}/{} has no payload", bucket, key);
            }
            err
        })?;
        Ok((object, file))
    }

    /// Catalog record only. Same visibility rules as `get_object_reader`.
    pub async fn get_object_metadata(&self, bucket: &str, key: &str) -> StorageResult<Object> {
        ensure_key_safe(key)?;
        self.ensure_bucket(bucket).await?;
        let object = self.lookup_object(bucket, key).await?;
        if !self.content.content_exists(bucket, key).await? {
            warn!("catalog entry {}/{} has no payload", bucket, key);
            return Err(object_not_found(bucket, key));
        }
        Ok(object)
    }

    /// The bucket's object catalog, in catalog order.
    pub async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<Object>> {
        self.ensure_bucket(bucket).await?;
        let _objects_guard = self.locks.object_catalog(bucket).await;
        self.load_objects(bucket).await
    }

    /// Delete an object: catalog entry first, then the payload.
    ///
    /// Succeeds if either the entry or the payload exists; reports
    /// `ObjectNotFound` only when neither does.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        ensure_key_safe(key)?;
        self.ensure_bucket(bucket).await?;

        let _key_guard = self.locks.object_key(bucket, key).await;
        let has_content = self.content.content_exists(bucket, key).await?;
        {
            let _objects_guard = self.locks.object_catalog(bucket).await;
            let mut objects = self.load_objects(bucket).await?;
            let before = objects.len();
            objects.retain(|o| o.key != key);
            let had_entry = objects.len() != before;

            if !had_entry && !has_content {
                return Err(object_not_found(bucket, key));
            }
            if had_entry {
                self.catalog.write_objects(bucket, &objects).await?;
            } else {
                warn!("removing unrecorded payload {}/{}", bucket, key);
            }
        }

        if has_content {
            match self.content.delete_content(bucket, key).await {
                Ok(()) | Err(StorageError::ObjectNotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }

        info!("object {}/{} deleted", bucket, key);
        Ok(())
    }

    /// Fails with `BucketNotFound` unless the bucket directory exists.
    ///
    /// Names that could never have been created are rejected without
    /// touching the filesystem.
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        if validate_bucket_name(bucket).is_err() || !self.content.bucket_exists(bucket).await? {
            return Err(StorageError::BucketNotFound(bucket.to_string()));
        }
        Ok(())
    }

    /// Read the object catalog; a missing catalog means the bucket is gone.
    /// Callers hold the object catalog lock.
    async fn load_objects(&self, bucket: &str) -> StorageResult<Vec<Object>> {
        match self.catalog.read_objects(bucket).await {
            Err(StorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::BucketNotFound(bucket.to_string()))
            }
            other => other,
        }
    }

    async fn lookup_object(&self, bucket: &str, key: &str) -> StorageResult<Object> {
        let _objects_guard = self.locks.object_catalog(bucket).await;
        self.load_objects(bucket)
            .await?
            .into_iter()
            .find(|o| o.key == key)
            .ok_or_else(|| object_not_found(bucket, key))
    }

    /// Replace the entry for `object.key`, or append it.
    async fn record_object(&self, bucket: &str, object: Object) -> StorageResult<()> {
        let _objects_guard = self.locks.object_catalog(bucket).await;
        let mut objects = self.load_objects(bucket).await?;
        match objects.iter_mut().find(|o| o.key == object.key) {
            Some(existing) => *existing = object,
            None => objects.push(object),
        }
        self.catalog.write_objects(bucket, &objects).await
    }
}

fn object_not_found(bucket: &str, key: &str) -> StorageError {
    StorageError::ObjectNotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
    }
}

/// Reject keys that would escape the bucket directory, collide with the
/// object catalog, or not fit in a catalog field.
fn ensure_key_safe(key: &str) -> StorageResult<()> {
    let invalid = || Err(StorageError::InvalidObjectKey(key.to_string()));

    if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
        return invalid();
    }
    if key == OBJECTS_FILE || !is_storable_field(key) {
        return invalid();
    }
    if key
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
    {
        return invalid();
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return invalid();
    }
    Ok(())
}
