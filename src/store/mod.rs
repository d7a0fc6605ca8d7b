//! The object store capability consumed by the browser.
//!
//! Everything the listing pipeline and the bulk operations need from a remote
//! store goes through [`ObjectStore`]. The production implementation is
//! [`crate::s3_client::S3Client`].

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::io;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// One stored object as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

impl ObjectRecord {
    pub fn new(key: impl Into<String>, size: u64, last_modified: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified,
        }
    }

    /// Directory part of the key: everything before the last '/'.
    ///
    /// Keys without a '/' (or with only a leading one) live at the top level
    /// and have no parent.
    pub fn parent_prefix(&self) -> Option<&str> {
        parent_prefix(&self.key)
    }
}

pub fn parent_prefix(key: &str) -> Option<&str> {
    match key.rfind('/') {
        Some(0) | None => None,
        Some(idx) => Some(&key[..idx]),
    }
}

/// Streamed object content, used for both directions of a transfer.
pub type ByteStream = BoxStream<'static, Result<Bytes, StoreError>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("operation canceled")]
    Canceled,
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("store returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response from store: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, StoreError::Canceled)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Remote object store scoped to a single bucket.
///
/// Implementations must be safe to share between the listing worker and the
/// bulk operation tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Lists up to `limit` objects under `scope` whose keys sort after
    /// `start_after`, in ascending key order. An empty `start_after` starts
    /// from the beginning; fewer than `limit` records means the listing ended.
    async fn list_batch(
        &self,
        scope: &str,
        start_after: &str,
        limit: usize,
    ) -> StoreResult<Vec<ObjectRecord>>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    async fn upload(
        &self,
        key: &str,
        body: ByteStream,
        length: u64,
        content_type: &str,
    ) -> StoreResult<()>;

    async fn download(&self, key: &str) -> StoreResult<ByteStream>;

    async fn presigned_url(&self, key: &str, expiry: Duration) -> StoreResult<Url>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_prefix_is_text_before_last_slash() {
        assert_eq!(parent_prefix("a/b/c.txt"), Some("a/b"));
        assert_eq!(parent_prefix("a/1.txt"), Some("a"));
        assert_eq!(parent_prefix("top.txt"), None);
        assert_eq!(parent_prefix("/rooted.txt"), None);
        assert_eq!(parent_prefix("dir/"), Some("dir"));
    }
}
