use super::notifier::UpdateThrottle;
use super::{LoadId, WorkerEvent};
use crate::store::{ObjectStore, StoreError};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Parameters of one listing pass.
#[derive(Debug, Clone)]
pub(crate) struct LoadJob {
    pub id: LoadId,
    pub scope: String,
    /// Cursor to resume from; empty for a fresh load.
    pub start_after: String,
    /// Absolute object count at which the pass stops, counting
    /// `already_loaded`.
    pub ceiling: Option<usize>,
    pub already_loaded: usize,
    pub batch_size: usize,
    pub update_interval: Duration,
}

/// Why a listing pass ended.
#[derive(Debug)]
pub(crate) enum LoadOutcome {
    Canceled,
    CeilingReached,
    Exhausted,
    Failed(StoreError),
}

/// Runs the listing pass on `runtime`. The pass always ends with exactly one
/// `Finished` event, even when the listing panics.
pub(crate) fn spawn(
    runtime: &Handle,
    store: Arc<dyn ObjectStore>,
    job: LoadJob,
    token: CancellationToken,
    tx: UnboundedSender<WorkerEvent>,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let id = job.id;
        let outcome = match AssertUnwindSafe(run(store, job, token, tx.clone()))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(load = %id, "listing worker panicked: {message}");
                LoadOutcome::Failed(StoreError::Other(anyhow::anyhow!(
                    "listing worker panicked: {message}"
                )))
            }
        };
        let _ = tx.send(WorkerEvent::Finished { id, outcome });
    })
}

async fn run(
    store: Arc<dyn ObjectStore>,
    job: LoadJob,
    token: CancellationToken,
    tx: UnboundedSender<WorkerEvent>,
) -> LoadOutcome {
    let LoadJob {
        id,
        scope,
        start_after,
        ceiling,
        already_loaded,
        batch_size,
        update_interval,
    } = job;
    let batch_size = batch_size.max(1);
    let mut last_key = start_after;
    let mut loaded = already_loaded;
    let mut throttle = UpdateThrottle::new(update_interval);
    let mut first_batch = true;

    info!(load = %id, scope = %scope, ?ceiling, "starting listing");

    loop {
        if token.is_cancelled() {
            return LoadOutcome::Canceled;
        }
        let page_size = match ceiling {
            Some(ceiling) if loaded >= ceiling => {
                debug!(load = %id, loaded, "object ceiling reached");
                return LoadOutcome::CeilingReached;
            }
            Some(ceiling) => batch_size.min(ceiling - loaded),
            None => batch_size,
        };

        let page = tokio::select! {
            biased;
            _ = token.cancelled() => return LoadOutcome::Canceled,
            page = store.list_batch(&scope, &last_key, page_size) => page,
        };
        let records = match page {
            Ok(records) => records,
            Err(e) if e.is_canceled() => return LoadOutcome::Canceled,
            Err(e) => {
                error!(load = %id, loaded, "listing failed: {e}");
                return LoadOutcome::Failed(e);
            }
        };
        let Some(last) = records.last() else {
            return LoadOutcome::Exhausted;
        };

        let exhausted = records.len() < page_size;
        let reaches_ceiling = ceiling.is_some_and(|c| loaded + records.len() >= c);
        last_key = last.key.clone();
        loaded += records.len();

        let refresh = throttle.check(Instant::now(), first_batch, exhausted || reaches_ceiling);
        first_batch = false;
        debug!(load = %id, page = records.len(), loaded, refresh, "page fetched");

        if tx.send(WorkerEvent::Page { id, records, refresh }).is_err() {
            // nobody is listening anymore
            return LoadOutcome::Canceled;
        }
        if exhausted {
            return LoadOutcome::Exhausted;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
