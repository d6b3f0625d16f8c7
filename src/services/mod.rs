//! Storage core: catalogs, payloads, locking and the lifecycle operations.

pub mod bucket_service;
pub mod catalog;
pub mod content;
pub mod locks;
pub mod name_validator;
pub mod object_service;
pub mod storage_service;
