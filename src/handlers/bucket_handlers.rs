//! HTTP handlers for bucket operations and for paths that match no route.

use crate::{errors::AppError, models::bucket::Bucket, services::storage_service::StorageService};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
};
use serde::Serialize;

/// Body of `GET /`.
#[derive(Debug, Serialize)]
pub struct BucketListing {
    pub buckets: Vec<Bucket>,
}

/// PUT `/{bucket}` — create bucket.
pub async fn create_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<Json<Bucket>, AppError> {
    let bucket = service.create_bucket(&bucket).await?;
    Ok(Json(bucket))
}

/// GET `/` — list buckets.
pub async fn list_buckets(
    State(service): State<StorageService>,
) -> Result<Json<BucketListing>, AppError> {
    let buckets = service.list_buckets().await?;
    Ok(Json(BucketListing { buckets }))
}

/// DELETE `/{bucket}` — delete an empty bucket.
pub async fn delete_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_bucket(&bucket).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Anything that is neither `/`, `/{bucket}` nor `/{bucket}/{*key}`,
/// e.g. `/docs/` with an empty key.
pub async fn malformed_path(uri: Uri) -> AppError {
    tracing::warn!("malformed path {}", uri.path());
    AppError::malformed_path(uri.path())
}
