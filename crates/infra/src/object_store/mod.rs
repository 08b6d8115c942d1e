//! Object store boundary for product assets (cover images, PDFs).
//!
//! Objects are addressed by `(bucket, path)`. Paths are relative, use `/` as
//! separator and are restricted to URL-safe characters so they can be placed
//! into signed URLs verbatim.

pub mod in_memory;
pub mod signing;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

pub use in_memory::InMemoryObjectStore;
pub use signing::UrlSigner;

/// Bucket holding downloadable product PDFs.
pub const PRODUCT_FILES_BUCKET: &str = "product-files";
/// Bucket holding product cover images.
pub const PRODUCT_COVERS_BUCKET: &str = "product-covers";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectStoreError {
    #[error("object not found: {bucket}/{path}")]
    NotFound { bucket: String, path: String },

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

/// Object bytes plus the content type they were uploaded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Time-limited URL granting read access to one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `(bucket, path)`, replacing any existing object.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    async fn download(&self, bucket: &str, path: &str) -> Result<StoredObject, ObjectStoreError>;

    /// Remove an object. Removing a missing object is not an error.
    async fn remove(&self, bucket: &str, path: &str) -> Result<(), ObjectStoreError>;

    /// Sign a read URL for an existing object, valid for `ttl` from `now`.
    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<SignedUrl, ObjectStoreError>;
}

/// Strip leading slashes and reject anything that could escape the bucket.
pub fn normalize_path(raw: &str) -> Result<String, ObjectStoreError> {
    let path = raw.trim().trim_start_matches('/');
    let well_formed = !path.is_empty()
        && !path.ends_with('/')
        && path.split('/').all(|seg| !seg.is_empty() && seg != "." && seg != "..")
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    if !well_formed {
        return Err(ObjectStoreError::InvalidPath(raw.to_string()));
    }
    Ok(path.to_string())
}

pub fn validate_bucket(bucket: &str) -> Result<(), ObjectStoreError> {
    let ok = !bucket.is_empty()
        && bucket
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(ObjectStoreError::InvalidPath(format!("bucket '{bucket}'")))
    }
}
