use super::{ByteStream, ObjectRecord, ObjectStore, StoreError, StoreResult};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{TimeZone, Utc};
use futures::{stream, StreamExt};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// In-memory store for exercising the browser without a network.
#[derive(Default)]
pub(crate) struct MemoryStore {
    objects: Mutex<BTreeMap<String, Bytes>>,
    content_types: Mutex<BTreeMap<String, String>>,
    list_calls: AtomicUsize,
    /// List calls numbered above this never complete.
    stall_after: Option<usize>,
    /// The list call with this number fails.
    fail_on_call: Option<usize>,
    /// The list call with this number panics.
    panic_on_call: Option<usize>,
    /// Downloads of this key fail after the first chunk.
    broken_download: Option<String>,
}

impl MemoryStore {
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::default();
        {
            let mut objects = store.objects.lock().unwrap();
            for key in keys {
                let key = key.into();
                let body = Bytes::from(format!("content of {key}"));
                objects.insert(key, body);
            }
        }
        store
    }

    pub fn sequential(count: usize) -> Self {
        Self::with_keys((0..count).map(|i| format!("obj{i:04}")))
    }

    pub fn stall_after(mut self, calls: usize) -> Self {
        self.stall_after = Some(calls);
        self
    }

    pub fn fail_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn panic_on_call(mut self, call: usize) -> Self {
        self.panic_on_call = Some(call);
        self
    }

    pub fn break_download_of(mut self, key: &str) -> Self {
        self.broken_download = Some(key.to_string());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn content(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.content_types.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_batch(
        &self,
        scope: &str,
        start_after: &str,
        limit: usize,
    ) -> StoreResult<Vec<ObjectRecord>> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.stall_after.is_some_and(|n| call > n) {
            futures::future::pending::<()>().await;
        }
        if self.fail_on_call == Some(call) {
            return Err(StoreError::Status {
                status: 503,
                message: "slow down".to_string(),
            });
        }
        if self.panic_on_call == Some(call) {
            panic!("listing exploded on call {call}");
        }
        tokio::task::yield_now().await;

        let modified = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|(key, _)| key.starts_with(scope))
            .filter(|(key, _)| start_after.is_empty() || key.as_str() > start_after)
            .take(limit)
            .map(|(key, body)| ObjectRecord::new(key.clone(), body.len() as u64, modified))
            .collect())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match self.objects.lock().unwrap().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    async fn upload(
        &self,
        key: &str,
        mut body: ByteStream,
        length: u64,
        content_type: &str,
    ) -> StoreResult<()> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        if buf.len() as u64 != length {
            return Err(StoreError::InvalidResponse(format!(
                "expected {length} bytes, got {}",
                buf.len()
            )));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), buf.freeze());
        self.content_types
            .lock()
            .unwrap()
            .insert(key.to_string(), content_type.to_string());
        Ok(())
    }

    async fn download(&self, key: &str) -> StoreResult<ByteStream> {
        let body = self
            .content(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let mid = body.len() / 2;
        let rest = if self.broken_download.as_deref() == Some(key) {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )))
        } else {
            Ok(body.slice(mid..))
        };
        let chunks = vec![Ok(body.slice(..mid)), rest];
        Ok(stream::iter(chunks).boxed())
    }

    async fn presigned_url(&self, key: &str, expiry: Duration) -> StoreResult<Url> {
        if !self.contains(key) {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let mut url = Url::parse("https://memory.invalid/bucket/")
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidResponse("cannot-be-a-base url".into()))?
            .pop_if_empty()
            .extend(key.split('/'));
        url.query_pairs_mut()
            .append_pair("X-Amz-Expires", &expiry.as_secs().to_string());
        Ok(url)
    }
}
