//! Bucket lifecycle: create, list and delete.
//!
//! Bucket creation and deletion touch both the bucket catalog and the
//! filesystem. The steps are ordered but not transactional: a failure after
//! the catalog is persisted leaves the catalog and the directory tree out of
//! step until an operator intervenes. Create checks that nothing but a
//! directory occupies the bucket's path before it persists anything.

use crate::{
    models::bucket::Bucket,
    services::{
        name_validator::validate_bucket_name,
        storage_service::{StorageError, StorageResult, StorageService},
    },
};
use chrono::Utc;
use std::io::ErrorKind;
use tracing::{info, warn};

impl StorageService {
    /// Create a bucket, its directory and an empty object catalog.
    ///
    /// Returns `InvalidBucketName` for names that fail validation and
    /// `BucketAlreadyExists` when the catalog already holds the name or a
    /// plain file sits where the bucket directory would go.
    pub async fn create_bucket(&self, name: &str) -> StorageResult<Bucket> {
        validate_bucket_name(name).map_err(|reason| StorageError::InvalidBucketName {
            name: name.to_string(),
            reason,
        })?;

        let _catalog_guard = self.locks.bucket_catalog().await;
        let mut buckets = self.catalog.read_buckets().await?;
        if buckets.iter().any(|b| b.name == name) {
            return Err(StorageError::BucketAlreadyExists(name.to_string()));
        }

        if !self.content.bucket_path_available(name).await? {
            return Err(StorageError::BucketAlreadyExists(name.to_string()));
        }

        let bucket = Bucket::new(name, Utc::now());
        buckets.push(bucket.clone());
        self.catalog.write_buckets(&buckets).await?;

        self.content.create_bucket_dir(name).await?;
        let _objects_guard = self.locks.object_catalog(name).await;
        self.catalog.write_objects(name, &[]).await?;

        info!("bucket {} created", name);
        Ok(bucket)
    }

    /// Every bucket in the catalog, in catalog order.
    pub async fn list_buckets(&self) -> StorageResult<Vec<Bucket>> {
        let _catalog_guard = self.locks.bucket_catalog().await;
        self.catalog.read_buckets().await
    }

    /// Delete an empty bucket.
    ///
    /// - `BucketNotFound` if the catalog has no such bucket
    /// - `BucketNotEmpty` if its object catalog has entries
    ///
    /// The record is removed from the catalog before the directory is
    /// removed; a missing object catalog counts as empty.
    pub async fn delete_bucket(&self, name: &str) -> StorageResult<()> {
        if validate_bucket_name(name).is_err() {
            return Err(StorageError::BucketNotFound(name.to_string()));
        }

        let _catalog_guard = self.locks.bucket_catalog().await;
        let mut buckets = self.catalog.read_buckets().await?;
        let Some(index) = buckets.iter().position(|b| b.name == name) else {
            return Err(StorageError::BucketNotFound(name.to_string()));
        };

        let _objects_guard = self.locks.object_catalog(name).await;
        let objects = match self.catalog.read_objects(name).await {
            Ok(objects) => objects,
            Err(StorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                warn!("bucket {} has no object catalog, treating as empty", name);
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        if !objects.is_empty() {
            return Err(StorageError::BucketNotEmpty(name.to_string()));
        }

        // catalog order carries no meaning
        buckets.swap_remove(index);
        self.catalog.write_buckets(&buckets).await?;
        self.content.remove_bucket_dir(name).await?;

        info!("bucket {} deleted", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        models::{bucket::BucketStatus, object::Object},
        services::{
            name_validator::BucketNameError,
            storage_service::{StorageConfig, StorageError, StorageService},
        },
    };
    use chrono::Utc;
    use tempfile::TempDir;

    async fn service() -> (TempDir, StorageService) {
        let dir = TempDir::new().expect("temp dir");
        let service = StorageService::new(&StorageConfig::new(dir.path()));
        service.init().await.expect("init");
        (dir, service)
    }

    #[tokio::test]
    async fn create_provisions_directory_and_catalog() {
        let (dir, service) = service().await;
        let bucket = service.create_bucket("my-bucket").await.unwrap();
        assert_eq!(bucket.name, "my-bucket");
        assert_eq!(bucket.status, BucketStatus::Active);
        assert_eq!(bucket.creation_date, bucket.last_updated);

        assert!(dir.path().join("my-bucket").is_dir());
        let objects = std::fs::read_to_string(dir.path().join("my-bucket/objects.csv")).unwrap();
        assert_eq!(objects, "ObjectKey,ContentType,ContentLength,LastModified\n");

        assert_eq!(service.list_buckets().await.unwrap(), vec![bucket]);
    }

    #[tokio::test]
    async fn create_is_not_idempotent() {
        let (_dir, service) = service().await;
        service.create_bucket("my-bucket").await.unwrap();
        let err = service.create_bucket("my-bucket").await.unwrap_err();
        assert!(matches!(err, StorageError::BucketAlreadyExists(_)));
        assert_eq!(service.list_buckets().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_accepts_leftover_directory() {
        let (dir, service) = service().await;
        std::fs::create_dir(dir.path().join("leftover")).unwrap();
        service.create_bucket("leftover").await.unwrap();
        assert!(service.list_objects("leftover").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_invalid_names() {
        let (dir, service) = service().await;
        let err = service.create_bucket("ab").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidBucketName {
                reason: BucketNameError::InvalidLength,
                ..
            }
        ));
        assert!(service.list_buckets().await.unwrap().is_empty());
        assert!(!dir.path().join("ab").exists());
    }

    #[tokio::test]
    async fn create_rejects_catalog_file_name() {
        let (dir, service) = service().await;
        let err = service.create_bucket("buckets.csv").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidBucketName {
                reason: BucketNameError::Reserved,
                ..
            }
        ));
        assert!(service.list_buckets().await.unwrap().is_empty());
        assert!(dir.path().join("buckets.csv").is_file());

        // the catalog is still usable afterwards
        service.create_bucket("docs").await.unwrap();
        assert_eq!(service.list_buckets().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_over_plain_file_records_nothing() {
        let (dir, service) = service().await;
        std::fs::write(dir.path().join("notes.txt"), b"not a bucket").unwrap();

        let err = service.create_bucket("notes.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::BucketAlreadyExists(_)));
        assert!(service.list_buckets().await.unwrap().is_empty());
        assert_eq!(
            std::fs::read(dir.path().join("notes.txt")).unwrap(),
            b"not a bucket"
        );
        assert!(matches!(
            service.delete_bucket("notes.txt").await.unwrap_err(),
            StorageError::BucketNotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_missing_bucket_is_not_found() {
        let (_dir, service) = service().await;
        assert!(matches!(
            service.delete_bucket("ghost").await.unwrap_err(),
            StorageError::BucketNotFound(_)
        ));
        assert!(matches!(
            service.delete_bucket("../etc").await.unwrap_err(),
            StorageError::BucketNotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_refuses_non_empty_bucket() {
        let (dir, service) = service().await;
        service.create_bucket("docs").await.unwrap();
        service
            .catalog
            .write_objects(
                "docs",
                &[Object {
                    key: "readme.txt".into(),
                    content_type: "text/plain".into(),
                    content_length: 5,
                    last_modified: Utc::now(),
                }],
            )
            .await
            .unwrap();

        let err = service.delete_bucket("docs").await.unwrap_err();
        assert!(matches!(err, StorageError::BucketNotEmpty(_)));
        assert!(dir.path().join("docs").is_dir());
        assert_eq!(service.list_buckets().await.unwrap().len(), 1);

        service.catalog.write_objects("docs", &[]).await.unwrap();
        service.delete_bucket("docs").await.unwrap();
        assert!(!dir.path().join("docs").exists());
        assert!(service.list_buckets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_keeps_other_buckets() {
        let (_dir, service) = service().await;
        for name in ["alpha", "beta", "gamma"] {
            service.create_bucket(name).await.unwrap();
        }
        service.delete_bucket("alpha").await.unwrap();

        let mut names: Vec<String> = service
            .list_buckets()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        names.sort();
        assert_eq!(names, ["beta", "gamma"]);
    }

    #[tokio::test]
    async fn delete_tolerates_missing_directory() {
        let (dir, service) = service().await;
        service.create_bucket("orphan").await.unwrap();
        std::fs::remove_dir_all(dir.path().join("orphan")).unwrap();
        service.delete_bucket("orphan").await.unwrap();
        assert!(service.list_buckets().await.unwrap().is_empty());
    }
}
