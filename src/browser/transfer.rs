//! Single-object operations and their bulk loops.
//!
//! Bulk loops work item by item and keep going after a failure; every item
//! ends with exactly one `Done` or `Failed` event.

use crate::content_type;
use crate::error::{BrowseError, Operation};
use crate::store::{ByteStream, ObjectStore, StoreError, StoreResult};
use bytes::Bytes;
use futures::StreamExt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use url::Url;

const UPLOAD_CHUNK: usize = 64 * 1024;

#[derive(Debug)]
pub enum TransferEvent {
    Progress {
        operation: Operation,
        key: String,
        transferred: u64,
        total: Option<u64>,
    },
    Done {
        operation: Operation,
        key: String,
    },
    Failed(BrowseError),
    Link {
        key: String,
        url: Url,
    },
}

/// Receives transfer events. Cloned into upload body streams, hence the
/// bounds.
pub trait TransferSink: Fn(TransferEvent) + Clone + Send + Sync + 'static {}

impl<T> TransferSink for T where T: Fn(TransferEvent) + Clone + Send + Sync + 'static {}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BulkSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkSummary {
    fn record<S: TransferSink>(
        &mut self,
        sink: &S,
        operation: Operation,
        key: &str,
        result: StoreResult<()>,
    ) {
        match result {
            Ok(()) => {
                self.succeeded += 1;
                sink(TransferEvent::Done {
                    operation,
                    key: key.to_string(),
                });
            }
            Err(e) => {
                self.failed += 1;
                warn!(%operation, key, "item failed: {e}");
                sink(TransferEvent::Failed(BrowseError::item(operation, key, e)));
            }
        }
    }
}

/// Object key for uploading `file_name` below `dest_prefix`.
pub fn upload_key(dest_prefix: &str, file_name: &str) -> String {
    let prefix = dest_prefix.trim_end_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{prefix}/{file_name}")
    }
}

/// Local path a download of `key` is written to, or `None` when the last
/// key segment is not a usable file name.
pub fn download_target(folder: &Path, key: &str) -> Option<PathBuf> {
    let name = key.rsplit('/').next().unwrap_or(key);
    match name {
        "" | "." | ".." => None,
        name => Some(folder.join(name)),
    }
}

pub async fn delete_keys<S: TransferSink>(
    store: &dyn ObjectStore,
    keys: Vec<String>,
    sink: S,
) -> BulkSummary {
    let mut summary = BulkSummary::default();
    for key in &keys {
        let result = store.delete(key).await;
        summary.record(&sink, Operation::Delete, key, result);
    }
    info!(succeeded = summary.succeeded, failed = summary.failed, "bulk delete finished");
    summary
}

pub async fn download_keys<S: TransferSink>(
    store: &dyn ObjectStore,
    keys: Vec<String>,
    folder: &Path,
    sink: S,
) -> BulkSummary {
    let mut summary = BulkSummary::default();
    for key in &keys {
        let result = download_one(store, key, folder, &sink).await;
        summary.record(&sink, Operation::Download, key, result);
    }
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        folder = %folder.display(),
        "bulk download finished"
    );
    summary
}

async fn download_one<S: TransferSink>(
    store: &dyn ObjectStore,
    key: &str,
    folder: &Path,
    sink: &S,
) -> StoreResult<()> {
    let target = download_target(folder, key).ok_or_else(|| {
        StoreError::Other(anyhow::anyhow!("key `{key}` has no usable file name"))
    })?;
    let body = store.download(key).await?;
    let file = File::create(&target).await?;
    if let Err(e) = write_body(body, file, key, sink).await {
        // a partial file would look like a finished download
        if let Err(remove) = tokio::fs::remove_file(&target).await {
            warn!(path = %target.display(), "could not remove partial download: {}", remove);
        }
        return Err(e);
    }
    Ok(())
}

async fn write_body<S: TransferSink>(
    mut body: ByteStream,
    mut file: File,
    key: &str,
    sink: &S,
) -> StoreResult<()> {
    let mut received = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        received += chunk.len() as u64;
        sink(TransferEvent::Progress {
            operation: Operation::Download,
            key: key.to_string(),
            transferred: received,
            total: None,
        });
    }
    file.flush().await?;
    Ok(())
}

/// Streams a local file to `dest_prefix/<file name>`.
pub async fn upload_file<S: TransferSink>(
    store: &dyn ObjectStore,
    path: &Path,
    dest_prefix: &str,
    sink: S,
) -> BulkSummary {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let key = upload_key(dest_prefix, &name);
    let result = if name.is_empty() {
        Err(StoreError::Other(anyhow::anyhow!(
            "`{}` is not a file",
            path.display()
        )))
    } else {
        upload_one(store, path, &key, &sink).await
    };
    let mut summary = BulkSummary::default();
    summary.record(&sink, Operation::Upload, &key, result);
    summary
}

async fn upload_one<S: TransferSink>(
    store: &dyn ObjectStore,
    path: &Path,
    key: &str,
    sink: &S,
) -> StoreResult<()> {
    let mut file = File::open(path).await?;
    let length = file.metadata().await?.len();

    let mut head = Vec::with_capacity(content_type::SNIFF_LEN);
    (&mut file)
        .take(content_type::SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .await?;
    file.seek(SeekFrom::Start(0)).await?;
    let content_type = content_type::detect(&head, key);
    info!(key, length, content_type, "uploading");

    let progress_key = key.to_string();
    let progress = sink.clone();
    let mut sent = 0u64;
    let body = ReaderStream::with_capacity(file, UPLOAD_CHUNK)
        .map(move |chunk: std::io::Result<Bytes>| -> StoreResult<Bytes> {
            let chunk = chunk?;
            sent += chunk.len() as u64;
            progress(TransferEvent::Progress {
                operation: Operation::Upload,
                key: progress_key.clone(),
                transferred: sent,
                total: Some(length),
            });
            Ok(chunk)
        })
        .boxed();

    store.upload(key, body, length, content_type).await
}

pub async fn presign<S: TransferSink>(
    store: &dyn ObjectStore,
    key: &str,
    expiry: Duration,
    sink: S,
) -> BulkSummary {
    let mut summary = BulkSummary::default();
    match store.presigned_url(key, expiry).await {
        Ok(url) => {
            summary.succeeded += 1;
            sink(TransferEvent::Link {
                key: key.to_string(),
                url,
            });
        }
        Err(e) => summary.record(&sink, Operation::Link, key, Err(e)),
    }
    summary
}
