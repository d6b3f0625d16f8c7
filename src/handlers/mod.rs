//! HTTP handlers, one module per resource.

pub mod bucket_handlers;
pub mod object_handlers;
