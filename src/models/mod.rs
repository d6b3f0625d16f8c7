//! Core data models for the object store.
//!
//! These entities are the records held in the bucket and object catalogs.
//! They serialize as JSON via `serde` for HTTP responses; their on-disk
//! representation lives in `services::catalog`.

pub mod bucket;
pub mod object;
