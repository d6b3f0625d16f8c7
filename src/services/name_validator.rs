//! Bucket name validation.
//!
//! Rules are checked in a fixed order and the first failing rule is the one
//! reported, so `"ab"` is always `InvalidLength` even though it would also
//! pass or fail later checks.

use crate::services::catalog::BUCKETS_FILE;
use thiserror::Error;

const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

/// Reason a bucket name was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BucketNameError {
    #[error("bucket name length must be between 3 and 63 characters")]
    InvalidLength,
    #[error("bucket name must not be formatted as an IP address")]
    LooksLikeIpAddress,
    #[error("bucket name must not contain two adjacent periods")]
    AdjacentPeriods,
    #[error("bucket name must not contain two adjacent dashes")]
    AdjacentDashes,
    #[error(
        "bucket name must only contain lowercase letters, numbers, hyphens, and periods, and must start and end with a letter or number"
    )]
    InvalidCharacters,
    #[error("bucket name is reserved for the bucket catalog")]
    Reserved,
}

/// Validate a bucket name.
///
/// - 3–63 characters
/// - not a dotted quad of digit runs (`192.168.5.4`)
/// - no `..` and no `--`
/// - lowercase letters, digits, dots, hyphens only, starting and ending
///   with a letter or digit
/// - not the bucket catalog's file name, which shares the data directory
pub fn validate_bucket_name(name: &str) -> Result<(), BucketNameError> {
    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return Err(BucketNameError::InvalidLength);
    }

    if is_dotted_quad(name) {
        return Err(BucketNameError::LooksLikeIpAddress);
    }

    if name.contains("..") {
        return Err(BucketNameError::AdjacentPeriods);
    }

    if name.contains("--") {
        return Err(BucketNameError::AdjacentDashes);
    }

    let bytes = name.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let inner_ok = |b: u8| edge_ok(b) || b == b'.' || b == b'-';
    if !edge_ok(bytes[0]) || !edge_ok(bytes[len - 1]) || !bytes.iter().all(|&b| inner_ok(b)) {
        return Err(BucketNameError::InvalidCharacters);
    }

    if name == BUCKETS_FILE {
        return Err(BucketNameError::Reserved);
    }

    Ok(())
}

/// True for `digits.digits.digits.digits` with any number of digits per run.
fn is_dotted_quad(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        for name in [
            "abc",
            "my-bucket",
            "docs",
            "a.b.c",
            "bucket-1.example.com",
            "123",
            "1.2.3",
            "1.2.3.4.5",
            "0a-b.c-d",
        ] {
            assert_eq!(validate_bucket_name(name), Ok(()), "{name}");
        }
        assert_eq!(validate_bucket_name(&"a".repeat(63)), Ok(()));
    }

    #[test]
    fn rejects_bad_length_first() {
        assert_eq!(validate_bucket_name("ab"), Err(BucketNameError::InvalidLength));
        assert_eq!(validate_bucket_name(""), Err(BucketNameError::InvalidLength));
        assert_eq!(validate_bucket_name("A_"), Err(BucketNameError::InvalidLength));
        assert_eq!(
            validate_bucket_name(&"a".repeat(64)),
            Err(BucketNameError::InvalidLength)
        );
    }

    #[test]
    fn rejects_ip_addresses() {
        assert_eq!(
            validate_bucket_name("192.168.5.4"),
            Err(BucketNameError::LooksLikeIpAddress)
        );
        assert_eq!(
            validate_bucket_name("999.0.0.1234"),
            Err(BucketNameError::LooksLikeIpAddress)
        );
    }

    #[test]
    fn rejects_adjacent_separators() {
        assert_eq!(validate_bucket_name("my..bucket"), Err(BucketNameError::AdjacentPeriods));
        assert_eq!(validate_bucket_name("my--bucket"), Err(BucketNameError::AdjacentDashes));
        // periods are checked before dashes
        assert_eq!(validate_bucket_name("a..b--c"), Err(BucketNameError::AdjacentPeriods));
        // adjacency wins over the character set
        assert_eq!(validate_bucket_name("Ab--cd"), Err(BucketNameError::AdjacentDashes));
    }

    #[test]
    fn rejects_bad_characters_and_edges() {
        for name in ["MyBucket", "my_bucket", "-bucket", "bucket-", ".bucket", "bucket.", "buc ket"] {
            assert_eq!(
                validate_bucket_name(name),
                Err(BucketNameError::InvalidCharacters),
                "{name}"
            );
        }
    }

    #[test]
    fn rejects_catalog_file_name() {
        assert_eq!(validate_bucket_name("buckets.csv"), Err(BucketNameError::Reserved));
        assert_eq!(validate_bucket_name("buckets.csv2"), Ok(()));
    }
}
