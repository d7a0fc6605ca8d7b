//! The listing pipeline and the state a front-end browses.
//!
//! [`Browser`] owns the object index, the visible projection, the selection
//! and the prefix tree. Only its methods mutate them; background work (the
//! listing worker and bulk actions) reports back through a channel and is
//! applied by [`Browser::pump`] or [`Browser::process_next`].

pub mod command;
pub mod debounce;
pub mod filter;
pub mod index;
pub(crate) mod loader;
pub mod notifier;
pub mod selection;
pub mod transfer;
pub mod tree;

#[cfg(test)]
mod tests;

pub use command::Command;
pub use filter::{Projection, Scope};
pub use index::ObjectIndex;
pub use notifier::{LoadProgress, LoadStatus, Notification};
pub use selection::SelectionSet;
pub use transfer::{BulkSummary, TransferEvent};
pub use tree::PrefixTree;

use crate::config::BrowserSettings;
use crate::error::{BrowseError, Operation};
use crate::store::{ObjectRecord, ObjectStore};
use debounce::Debouncer;
use loader::{LoadJob, LoadOutcome};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Identifies one listing pass. Increases with every start or continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadId(pub(crate) u64);

impl fmt::Display for LoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The in-flight listing pass.
#[derive(Debug, Clone)]
pub struct LoadHandle {
    pub id: LoadId,
    token: CancellationToken,
}

impl LoadHandle {
    /// Requests cooperative cancellation of the pass.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Messages from background tasks to the coordination context.
#[derive(Debug)]
pub(crate) enum WorkerEvent {
    Page {
        id: LoadId,
        records: Vec<ObjectRecord>,
        refresh: bool,
    },
    Finished {
        id: LoadId,
        outcome: LoadOutcome,
    },
    Transfer(TransferEvent),
    BulkDone {
        operation: Operation,
        summary: BulkSummary,
    },
}

/// Search term and scope the visible rows are derived from.
#[derive(Debug, Default, Clone)]
pub struct ViewState {
    pub search_term: String,
    pub scope: Scope,
    pub projection: Projection,
}

#[derive(Debug)]
struct ActiveLoad {
    handle: LoadHandle,
    started: Instant,
}

pub struct Browser {
    store: Arc<dyn ObjectStore>,
    runtime: Handle,
    settings: BrowserSettings,

    index: ObjectIndex,
    tree: PrefixTree,
    view: ViewState,
    selection: SelectionSet,
    search: Debouncer<String>,

    status: LoadStatus,
    has_more: bool,
    base_prefix: String,
    /// Objects per pass, as requested by the last `start_load`.
    load_limit: Option<usize>,
    active: Option<ActiveLoad>,
    next_id: u64,
    in_flight_ops: usize,

    tx: UnboundedSender<WorkerEvent>,
    rx: UnboundedReceiver<WorkerEvent>,
    notifications: VecDeque<Notification>,
}

impl Browser {
    pub fn new(store: Arc<dyn ObjectStore>, runtime: Handle, settings: BrowserSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let search = Debouncer::new(Duration::from_millis(settings.search_debounce_ms));
        Self {
            store,
            runtime,
            settings,
            index: ObjectIndex::new(),
            tree: PrefixTree::default(),
            view: ViewState::default(),
            selection: SelectionSet::new(),
            search,
            status: LoadStatus::Idle,
            has_more: false,
            base_prefix: String::new(),
            load_limit: None,
            active: None,
            next_id: 0,
            in_flight_ops: 0,
            tx,
            rx,
            notifications: VecDeque::new(),
        }
    }

    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    pub fn index(&self) -> &ObjectIndex {
        &self.index
    }

    pub fn tree(&self) -> &PrefixTree {
        &self.tree
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.active.is_some()
    }

    pub fn base_prefix(&self) -> &str {
        &self.base_prefix
    }

    /// Whether any bulk action is still running.
    pub fn is_busy(&self) -> bool {
        self.in_flight_ops > 0
    }

    pub fn visible_len(&self) -> usize {
        self.view.projection.len()
    }

    /// The record shown at a visible row.
    pub fn visible(&self, row: usize) -> Option<&ObjectRecord> {
        self.view.projection.resolve(self.index.objects(), row)
    }

    pub fn visible_objects(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.view.projection.iter(self.index.objects())
    }

    /// Count line for the status bar.
    pub fn items_label(&self) -> String {
        let visible = self.visible_len();
        let total = self.index.len();
        let suffix = match (self.has_more, self.load_limit) {
            (true, Some(limit)) => {
                format!(" (limited to {limit}, use Load More or a higher limit to see more)")
            }
            _ => String::new(),
        };
        if visible != total {
            format!("Items: {visible} of {total} total{suffix}")
        } else {
            format!("Total Items: {total}{suffix}")
        }
    }

    pub fn drain_notifications(&mut self) -> impl Iterator<Item = Notification> + '_ {
        self.notifications.drain(..)
    }

    pub fn handle(&mut self, command: Command) {
        match command {
            Command::StartLoad { prefix, ceiling } => {
                self.start_load(&prefix, ceiling);
            }
            Command::ContinueLoad => {
                self.continue_load();
            }
            Command::CancelLoad => self.cancel_load(),
            Command::SetSearchTerm(term) => self.set_search_term(term),
            Command::SelectScope(scope) => self.select_scope(scope),
            Command::ToggleSelect(row) => {
                self.toggle_select(row);
            }
            Command::DeleteSelected => {
                self.delete_selected();
            }
            Command::UploadFile {
                local_path,
                destination_prefix,
            } => self.upload_file(local_path, destination_prefix),
            Command::DownloadSelected(folder) => {
                self.download_selected(folder);
            }
            Command::GetLink { row, expiry } => {
                self.get_link(row, expiry);
            }
        }
    }

    /// Starts a fresh listing of `prefix`, replacing everything loaded so
    /// far. A running load is canceled first.
    pub fn start_load(&mut self, prefix: &str, ceiling: Option<usize>) -> LoadHandle {
        self.abandon_active_load();

        let prefix = prefix.trim().trim_start_matches('/').to_string();
        self.index.reset();
        self.search.cancel();
        self.view = ViewState::default();
        self.has_more = false;
        self.base_prefix = prefix.clone();
        self.load_limit = ceiling.filter(|&c| c > 0);
        self.rebuild_tree();
        self.recompute_view();

        let job = self.job(prefix, String::new(), self.load_limit, 0);
        self.launch(job)
    }

    /// Resumes a load that stopped at its ceiling, fetching up to one more
    /// ceiling's worth after the last loaded key.
    pub fn continue_load(&mut self) -> Option<LoadHandle> {
        if self.active.is_some() || !self.has_more {
            return None;
        }
        let already_loaded = self.index.len();
        let start_after = self.index.last_key().unwrap_or_default().to_string();
        let ceiling = self.load_limit.map(|limit| already_loaded + limit);
        self.has_more = false;

        let job = self.job(self.base_prefix.clone(), start_after, ceiling, already_loaded);
        Some(self.launch(job))
    }

    /// Stops the running load, keeping what it already delivered.
    pub fn cancel_load(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.handle.cancel();
        info!(load = %active.handle.id, loaded = self.index.len(), "load canceled");
        self.finish(LoadStatus::CanceledAfter(self.index.len()));
    }

    /// Queues a new search term; it applies once typing pauses.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search.restart(term.into(), Instant::now());
    }

    /// Applies a search term right away, dropping any queued one.
    pub fn apply_search_now(&mut self, term: impl Into<String>) {
        self.search.cancel();
        self.apply_search(term.into());
    }

    /// Applies the queued search term without waiting for the quiet period.
    pub fn flush_search(&mut self) {
        if let Some(term) = self.search.cancel() {
            self.apply_search(term);
        }
    }

    pub fn select_scope(&mut self, scope: Scope) {
        if self.view.scope == scope {
            return;
        }
        debug!(%scope, "scope selected");
        self.view.scope = scope;
        self.recompute_view();
        self.emit_progress();
    }

    /// Flips the selection of a visible row. Rows outside the view are
    /// ignored.
    pub fn toggle_select(&mut self, row: usize) -> bool {
        if row >= self.visible_len() {
            return false;
        }
        let selected = self.selection.toggle(row);
        self.notify(Notification::SelectionChanged {
            count: self.selection.count(),
        });
        selected
    }

    pub fn set_selected(&mut self, row: usize, selected: bool) {
        if row >= self.visible_len() {
            return;
        }
        let changed = if selected {
            self.selection.select(row)
        } else {
            self.selection.deselect(row)
        };
        if changed {
            self.notify(Notification::SelectionChanged {
                count: self.selection.count(),
            });
        }
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.notify(Notification::SelectionChanged { count: 0 });
        }
    }

    /// Keys of the selected rows, in row order.
    pub fn selected_keys(&self) -> Vec<String> {
        self.selection
            .rows()
            .filter_map(|row| self.visible(row))
            .map(|o| o.key.clone())
            .collect()
    }

    /// Deletes every selected object. Returns how many were dispatched.
    pub fn delete_selected(&mut self) -> usize {
        let keys = self.selected_keys();
        if keys.is_empty() {
            return 0;
        }
        let count = keys.len();
        self.clear_selection();
        let store = self.store.clone();
        let sink = self.transfer_sink();
        self.spawn_bulk(Operation::Delete, async move {
            transfer::delete_keys(store.as_ref(), keys, sink).await
        });
        count
    }

    /// Uploads a local file below `destination_prefix`, or below the selected
    /// directory when none is given. A successful upload reloads the listing.
    pub fn upload_file(&mut self, local_path: PathBuf, destination_prefix: Option<String>) {
        let dest = destination_prefix
            .or_else(|| self.view.scope.key_prefix().map(str::to_string))
            .unwrap_or_default();
        let store = self.store.clone();
        let sink = self.transfer_sink();
        self.spawn_bulk(Operation::Upload, async move {
            transfer::upload_file(store.as_ref(), &local_path, &dest, sink).await
        });
    }

    /// Downloads every selected object into `folder`. Returns how many were
    /// dispatched.
    pub fn download_selected(&mut self, folder: PathBuf) -> usize {
        let keys = self.selected_keys();
        if keys.is_empty() {
            return 0;
        }
        let count = keys.len();
        let store = self.store.clone();
        let sink = self.transfer_sink();
        self.spawn_bulk(Operation::Download, async move {
            transfer::download_keys(store.as_ref(), keys, &folder, sink).await
        });
        count
    }

    /// Requests a presigned link for a visible row.
    pub fn get_link(&mut self, row: usize, expiry: Option<Duration>) -> bool {
        let Some(key) = self.visible(row).map(|o| o.key.clone()) else {
            return false;
        };
        let expiry = expiry.unwrap_or(Duration::from_secs(self.settings.link_expiry_secs));
        let store = self.store.clone();
        let sink = self.transfer_sink();
        self.spawn_bulk(Operation::Link, async move {
            transfer::presign(store.as_ref(), &key, expiry, sink).await
        });
        true
    }

    /// Applies everything background tasks reported so far and fires a due
    /// search. Never blocks. Returns whether anything was applied.
    pub fn pump(&mut self) -> bool {
        let mut applied = false;
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
            applied = true;
        }
        applied | self.tick(Instant::now())
    }

    /// Waits for the next background event or search deadline and applies
    /// it.
    pub async fn process_next(&mut self) {
        let deadline = self.search.deadline();
        let search_due = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            Some(event) = self.rx.recv() => self.apply(event),
            _ = search_due => {
                self.tick(Instant::now());
            }
        }
    }

    /// Runs until no load, bulk action or queued search is pending.
    pub async fn wait_idle(&mut self) {
        while self.active.is_some() || self.in_flight_ops > 0 || self.search.is_pending() {
            self.process_next().await;
        }
    }

    /// Fires the search debounce if it is due.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.search.fire_if_due(now) {
            Some(term) => {
                self.apply_search(term);
                true
            }
            None => false,
        }
    }

    fn job(
        &mut self,
        scope: String,
        start_after: String,
        ceiling: Option<usize>,
        already_loaded: usize,
    ) -> LoadJob {
        self.next_id = self.next_id.saturating_add(1);
        LoadJob {
            id: LoadId(self.next_id),
            scope,
            start_after,
            ceiling,
            already_loaded,
            batch_size: self.settings.batch_size,
            update_interval: Duration::from_millis(self.settings.update_interval_ms),
        }
    }

    fn launch(&mut self, job: LoadJob) -> LoadHandle {
        let handle = LoadHandle {
            id: job.id,
            token: CancellationToken::new(),
        };
        self.active = Some(ActiveLoad {
            handle: handle.clone(),
            started: Instant::now(),
        });
        self.status = LoadStatus::Loading {
            loaded: job.already_loaded,
        };
        self.emit_progress();

        loader::spawn(
            &self.runtime,
            self.store.clone(),
            job,
            handle.token.clone(),
            self.tx.clone(),
        );
        handle
    }

    fn abandon_active_load(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(load = %active.handle.id, "superseding running load");
            active.handle.cancel();
        }
    }

    fn is_active(&self, id: LoadId) -> bool {
        self.active.as_ref().is_some_and(|a| a.handle.id == id)
    }

    fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Page { id, records, refresh } => {
                if !self.is_active(id) {
                    debug!("{}", BrowseError::StaleLoad(id));
                    return;
                }
                self.index.append(records);
                self.status = LoadStatus::Loading {
                    loaded: self.index.len(),
                };
                if refresh {
                    self.rebuild_tree();
                    self.recompute_view();
                    self.emit_progress();
                }
            }
            WorkerEvent::Finished { id, outcome } => {
                if !self.is_active(id) {
                    debug!("{}", BrowseError::StaleLoad(id));
                    return;
                }
                self.on_finished(outcome);
            }
            WorkerEvent::Transfer(event) => self.on_transfer(event),
            WorkerEvent::BulkDone { operation, summary } => {
                self.in_flight_ops = self.in_flight_ops.saturating_sub(1);
                self.notify(Notification::BulkFinished { operation, summary });
                if operation == Operation::Upload && summary.succeeded > 0 {
                    let prefix = self.base_prefix.clone();
                    self.start_load(&prefix, self.load_limit);
                }
            }
        }
    }

    fn on_finished(&mut self, outcome: LoadOutcome) {
        let Some(active) = self.active.take() else {
            return;
        };
        let count = self.index.len();
        let elapsed = active.started.elapsed();
        let status = match outcome {
            LoadOutcome::CeilingReached => {
                self.has_more = true;
                LoadStatus::Loaded { count, elapsed }
            }
            LoadOutcome::Exhausted if count == 0 => LoadStatus::NoObjectsFound,
            LoadOutcome::Exhausted => LoadStatus::Loaded { count, elapsed },
            LoadOutcome::Canceled => LoadStatus::CanceledAfter(count),
            LoadOutcome::Failed(e) => {
                let status = LoadStatus::Failed(e.to_string());
                self.notify(Notification::Error(BrowseError::Fetch(e)));
                status
            }
        };
        info!(load = %active.handle.id, %status, has_more = self.has_more, "load finished");
        self.finish(status);
    }

    fn finish(&mut self, status: LoadStatus) {
        self.status = status;
        self.rebuild_tree();
        self.recompute_view();
        self.emit_progress();
    }

    fn on_transfer(&mut self, event: TransferEvent) {
        match event {
            TransferEvent::Progress {
                operation,
                key,
                transferred,
                total,
            } => self.notify(Notification::Transfer {
                operation,
                key,
                transferred,
                total,
            }),
            TransferEvent::Done { operation, key } => {
                if operation == Operation::Delete && self.index.remove(&key) {
                    self.rebuild_tree();
                    self.recompute_view();
                    self.emit_progress();
                }
                self.notify(Notification::ItemDone { operation, key });
            }
            TransferEvent::Failed(error) => {
                warn!("{error}");
                self.notify(Notification::Error(error));
            }
            TransferEvent::Link { key, url } => self.notify(Notification::Link { key, url }),
        }
    }

    fn apply_search(&mut self, term: String) {
        if self.view.search_term == term {
            return;
        }
        debug!(term = %term, "search applied");
        self.view.search_term = term;
        self.recompute_view();
        self.emit_progress();
    }

    fn rebuild_tree(&mut self) {
        self.tree = PrefixTree::build(self.index.prefixes());
    }

    /// Recomputes the visible rows. Row numbers change meaning, so the
    /// selection is dropped.
    fn recompute_view(&mut self) {
        self.view.projection =
            filter::compute(self.index.objects(), &self.view.search_term, &self.view.scope);
        self.clear_selection();
    }

    fn emit_progress(&mut self) {
        let progress = LoadProgress {
            total_loaded: self.index.len(),
            visible: self.visible_len(),
            has_more: self.has_more,
            status: self.status.clone(),
        };
        self.notify(Notification::Progress(progress));
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
    }

    fn transfer_sink(&self) -> impl transfer::TransferSink {
        let tx = self.tx.clone();
        move |event: TransferEvent| {
            let _ = tx.send(WorkerEvent::Transfer(event));
        }
    }

    fn spawn_bulk<F>(&mut self, operation: Operation, work: F)
    where
        F: Future<Output = BulkSummary> + Send + 'static,
    {
        self.in_flight_ops += 1;
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let summary = work.await;
            let _ = tx.send(WorkerEvent::BulkDone { operation, summary });
        });
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        self.abandon_active_load();
    }
}
