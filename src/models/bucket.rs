//! Represents a logical bucket — a top-level container for objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle state of a bucket. Only `Active` is ever written today.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketStatus {
    Active,
}

impl BucketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketStatus::Active => "Active",
        }
    }
}

impl fmt::Display for BucketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(BucketStatus::Active),
            other => Err(format!("unknown bucket status `{}`", other)),
        }
    }
}

/// A storage bucket as recorded in the bucket catalog.
///
/// The bucket name is the identity and is unique across the catalog.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Bucket name (validated against the DNS-style naming rules).
    pub name: String,

    pub status: BucketStatus,

    /// When this bucket was created.
    pub creation_date: DateTime<Utc>,

    /// When this bucket record was last touched.
    pub last_updated: DateTime<Utc>,
}

impl Bucket {
    /// Build a fresh, active bucket record stamped with `now`.
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            status: BucketStatus::Active,
            creation_date: now,
            last_updated: now,
        }
    }
}
