//! Metadata catalog store.
//!
//! Bucket and object catalogs are comma-delimited text files with a fixed
//! header line and one record per line:
//!
//! ```text
//! <data_dir>/buckets.csv          Name,Status,CreationDate,LastUpdated
//! <data_dir>/<bucket>/objects.csv ObjectKey,ContentType,ContentLength,LastModified
//! ```
//!
//! No escaping is performed. Field values must never contain the delimiter
//! or a line break; writing such a value is rejected instead of producing a
//! file that would not read back. Every write fully overwrites the file and
//! is not crash-atomic. Callers serialize read-modify-write sequences through
//! `services::locks`.

use crate::{
    models::{
        bucket::{Bucket, BucketStatus},
        object::Object,
    },
    services::storage_service::{StorageConfig, StorageError, StorageResult},
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;

pub const BUCKETS_FILE: &str = "buckets.csv";
pub const OBJECTS_FILE: &str = "objects.csv";
const DELIMITER: char = ',';

/// A row type stored in one of the catalog files.
trait CatalogRecord: Sized {
    const HEADER: [&'static str; 4];

    fn to_fields(&self) -> [String; 4];

    fn from_fields(fields: &[&str]) -> Result<Self, String>;
}

impl CatalogRecord for Bucket {
    const HEADER: [&'static str; 4] = ["Name", "Status", "CreationDate", "LastUpdated"];

    fn to_fields(&self) -> [String; 4] {
        [
            self.name.clone(),
            self.status.to_string(),
            format_timestamp(&self.creation_date),
            format_timestamp(&self.last_updated),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        Ok(Bucket {
            name: fields[0].to_string(),
            status: fields[1].parse::<BucketStatus>()?,
            creation_date: parse_timestamp(fields[2])?,
            last_updated: parse_timestamp(fields[3])?,
        })
    }
}

impl CatalogRecord for Object {
    const HEADER: [&'static str; 4] = ["ObjectKey", "ContentType", "ContentLength", "LastModified"];

    fn to_fields(&self) -> [String; 4] {
        [
            self.key.clone(),
            self.content_type.clone(),
            self.content_length.to_string(),
            format_timestamp(&self.last_modified),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        let content_length = fields[2]
            .parse::<u64>()
            .map_err(|err| format!("invalid content length `{}`: {}", fields[2], err))?;
        Ok(Object {
            key: fields[0].to_string(),
            content_type: fields[1].to_string(),
            content_length,
            last_modified: parse_timestamp(fields[3])?,
        })
    }
}

/// Reads and writes the on-disk catalogs beneath a data directory.
#[derive(Clone, Debug)]
pub struct CatalogStore {
    data_dir: PathBuf,
}

impl CatalogStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
        }
    }

    pub fn buckets_path(&self) -> PathBuf {
        self.data_dir.join(BUCKETS_FILE)
    }

    pub fn objects_path(&self, bucket: &str) -> PathBuf {
        self.data_dir.join(bucket).join(OBJECTS_FILE)
    }

    /// Make sure the data directory and the bucket catalog exist.
    ///
    /// An existing non-empty catalog is left untouched; a missing or
    /// zero-length one gets a header line.
    pub async fn init(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.data_dir).await?;
        let path = self.buckets_path();
        let needs_header = match fs::metadata(&path).await {
            Ok(meta) => meta.len() == 0,
            Err(err) if err.kind() == ErrorKind::NotFound => true,
            Err(err) => return Err(err.into()),
        };
        if needs_header {
            write_records::<Bucket>(&path, &[]).await?;
            debug!("initialized bucket catalog {}", path.display());
        }
        Ok(())
    }

    pub async fn read_buckets(&self) -> StorageResult<Vec<Bucket>> {
        read_records(&self.buckets_path()).await
    }

    pub async fn write_buckets(&self, buckets: &[Bucket]) -> StorageResult<()> {
        write_records(&self.buckets_path(), buckets).await
    }

    pub async fn read_objects(&self, bucket: &str) -> StorageResult<Vec<Object>> {
        read_records(&self.objects_path(bucket)).await
    }

    pub async fn write_objects(&self, bucket: &str, objects: &[Object]) -> StorageResult<()> {
        write_records(&self.objects_path(bucket), objects).await
    }
}

async fn read_records<R: CatalogRecord>(path: &Path) -> StorageResult<Vec<R>> {
    debug!("reading catalog {}", path.display());
    let text = fs::read_to_string(path).await?;
    decode_records(path, &text)
}

async fn write_records<R: CatalogRecord>(path: &Path, records: &[R]) -> StorageResult<()> {
    debug!("writing {} records to catalog {}", records.len(), path.display());
    let text = encode_records(path, records)?;
    let mut file = File::create(path).await?;
    file.write_all(text.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

fn encode_records<R: CatalogRecord>(path: &Path, records: &[R]) -> StorageResult<String> {
    let mut out = R::HEADER.join(",");
    out.push('\n');
    for (idx, record) in records.iter().enumerate() {
        let fields = record.to_fields();
        if let Some(bad) = fields.iter().find(|f| !is_storable_field(f)) {
            return Err(StorageError::CatalogFormat {
                path: path.to_path_buf(),
                line: idx + 2,
                reason: format!("field `{}` contains a delimiter or line break", bad.escape_debug()),
            });
        }
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    Ok(out)
}

fn decode_records<R: CatalogRecord>(path: &Path, text: &str) -> StorageResult<Vec<R>> {
    let format_err = |line: usize, reason: String| StorageError::CatalogFormat {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| !line.is_empty());

    let Some((header_no, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    if header.split(DELIMITER).ne(R::HEADER.iter().copied()) {
        return Err(format_err(
            header_no,
            format!("unexpected header `{}`, expected `{}`", header, R::HEADER.join(",")),
        ));
    }

    let mut records = Vec::new();
    for (line_no, line) in lines {
        let fields: Vec<&str> = line.split(DELIMITER).collect();
        if fields.len() != R::HEADER.len() {
            return Err(format_err(
                line_no,
                format!("expected {} fields, found {}", R::HEADER.len(), fields.len()),
            ));
        }
        records.push(R::from_fields(&fields).map_err(|reason| format_err(line_no, reason))?);
    }
    Ok(records)
}

/// True if `value` can be written into a catalog field as-is.
pub fn is_storable_field(value: &str) -> bool {
    !value.contains([DELIMITER, '\n', '\r'])
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| format!("invalid timestamp `{}`: {}", raw, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn store() -> (TempDir, CatalogStore) {
        let dir = TempDir::new().expect("temp dir");
        let store = CatalogStore::new(&StorageConfig::new(dir.path()));
        (dir, store)
    }

    fn sample_buckets() -> Vec<Bucket> {
        let t0 = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let t1 = Utc::now();
        vec![Bucket::new("alpha", t0), Bucket::new("beta.logs", t1)]
    }

    #[tokio::test]
    async fn init_writes_header_once() {
        let (_dir, store) = store();
        store.init().await.unwrap();
        let text = std::fs::read_to_string(store.buckets_path()).unwrap();
        assert_eq!(text, "Name,Status,CreationDate,LastUpdated\n");

        store.write_buckets(&sample_buckets()).await.unwrap();
        store.init().await.unwrap();
        assert_eq!(store.read_buckets().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn header_only_and_empty_files_read_as_empty() {
        let (_dir, store) = store();
        std::fs::write(store.buckets_path(), "").unwrap();
        assert!(store.read_buckets().await.unwrap().is_empty());

        std::fs::write(store.buckets_path(), "Name,Status,CreationDate,LastUpdated\n").unwrap();
        assert!(store.read_buckets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bucket_catalog_round_trips() {
        let (_dir, store) = store();
        let buckets = sample_buckets();
        store.write_buckets(&buckets).await.unwrap();
        let first = store.read_buckets().await.unwrap();
        assert_eq!(first, buckets);

        store.write_buckets(&first).await.unwrap();
        let before = std::fs::read_to_string(store.buckets_path()).unwrap();
        store
            .write_buckets(&store.read_buckets().await.unwrap())
            .await
            .unwrap();
        let after = std::fs::read_to_string(store.buckets_path()).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn object_catalog_round_trips() {
        let (dir, store) = store();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        let objects = vec![
            Object {
                key: "a/b/c".into(),
                content_type: "text/plain; charset=utf-8".into(),
                content_length: 5,
                last_modified: Utc::now(),
            },
            Object {
                key: "readme.txt".into(),
                content_type: "application/octet-stream".into(),
                content_length: 0,
                last_modified: Utc::now(),
            },
        ];
        store.write_objects("docs", &objects).await.unwrap();
        assert_eq!(store.read_objects("docs").await.unwrap(), objects);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let (_dir, store) = store();
        let err = store.read_buckets().await.unwrap_err();
        assert!(matches!(err, StorageError::Io(ref e) if e.kind() == ErrorKind::NotFound));
        assert!(matches!(
            store.read_objects("nope").await.unwrap_err(),
            StorageError::Io(_)
        ));
    }

    #[tokio::test]
    async fn malformed_records_are_format_errors() {
        let (_dir, store) = store();
        std::fs::write(
            store.buckets_path(),
            "Name,Status,CreationDate,LastUpdated\nalpha,Active\n",
        )
        .unwrap();
        let err = store.read_buckets().await.unwrap_err();
        assert!(matches!(err, StorageError::CatalogFormat { line: 2, .. }), "{err:?}");

        std::fs::write(
            store.buckets_path(),
            "Name,Status,CreationDate,LastUpdated\nalpha,Frozen,2024-01-01T00:00:00Z,2024-01-01T00:00:00Z\n",
        )
        .unwrap();
        assert!(matches!(
            store.read_buckets().await.unwrap_err(),
            StorageError::CatalogFormat { .. }
        ));

        std::fs::write(store.buckets_path(), "Key,Value\n").unwrap();
        assert!(matches!(
            store.read_buckets().await.unwrap_err(),
            StorageError::CatalogFormat { line: 1, .. }
        ));
    }

    #[tokio::test]
    async fn refuses_to_write_delimiters() {
        let (_dir, store) = store();
        let bad = vec![Bucket::new("a,b", Utc::now())];
        let err = store.write_buckets(&bad).await.unwrap_err();
        assert!(matches!(err, StorageError::CatalogFormat { line: 2, .. }));
    }
}
