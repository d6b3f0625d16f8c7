//! Represents an object (file) stored in a bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content type recorded when the client does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Catalog record for a single object within a bucket.
///
/// The `Object` struct stores metadata only; the bytes live in a content
/// file at `<data_dir>/<bucket>/<key>`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Content type (MIME type).
    pub content_type: String,

    /// Size in bytes.
    pub content_length: u64,

    /// Timestamp when object was last written.
    pub last_modified: DateTime<Utc>,
}

/// Pick the declared content type, or the default when none was given.
pub fn resolve_content_type(declared: Option<&str>) -> String {
    match declared.map(str::trim) {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => DEFAULT_CONTENT_TYPE.to_string(),
    }
}
