use super::transfer::BulkSummary;
use crate::error::{BrowseError, Operation};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Whether a page should trigger a visible refresh.
///
/// The first and the final page always do; anything in between only once the
/// interval has passed since the previous refresh.
pub fn should_emit(
    last_emit: Option<Instant>,
    now: Instant,
    interval: Duration,
    is_first_batch: bool,
    is_final_batch: bool,
) -> bool {
    if is_first_batch || is_final_batch {
        return true;
    }
    match last_emit {
        None => true,
        Some(last) => now.saturating_duration_since(last) >= interval,
    }
}

/// Remembers when the last refresh went out.
#[derive(Debug, Clone)]
pub struct UpdateThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl UpdateThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    /// Decides for one page and records the emission when it happens.
    pub fn check(&mut self, now: Instant, is_first_batch: bool, is_final_batch: bool) -> bool {
        let emit = should_emit(self.last_emit, now, self.interval, is_first_batch, is_final_batch);
        if emit {
            self.last_emit = Some(now);
        }
        emit
    }
}

/// Where the most recent load attempt stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Nothing loaded yet.
    Idle,
    Loading { loaded: usize },
    Loaded { count: usize, elapsed: Duration },
    CanceledAfter(usize),
    Failed(String),
    NoObjectsFound,
}

impl LoadStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadStatus::Loading { .. })
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Idle => f.write_str("Ready"),
            LoadStatus::Loading { loaded: 0 } => f.write_str("Loading objects…"),
            LoadStatus::Loading { loaded } => write!(f, "Loaded {loaded} objects…"),
            LoadStatus::Loaded { count, elapsed } => {
                write!(f, "Loaded {count} objects in {:.1}s", elapsed.as_secs_f64())
            }
            LoadStatus::CanceledAfter(n) => write!(f, "Load canceled ({n} objects loaded)"),
            LoadStatus::Failed(msg) => write!(f, "Failed to load objects: {msg}"),
            LoadStatus::NoObjectsFound => f.write_str("No objects found"),
        }
    }
}

/// Refresh event handed to the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProgress {
    pub total_loaded: usize,
    pub visible: usize,
    pub has_more: bool,
    pub status: LoadStatus,
}

/// Everything the browser reports to its front-end, in order of occurrence.
#[derive(Debug)]
pub enum Notification {
    Progress(LoadProgress),
    SelectionChanged { count: usize },
    Error(BrowseError),
    Transfer {
        operation: Operation,
        key: String,
        transferred: u64,
        total: Option<u64>,
    },
    ItemDone { operation: Operation, key: String },
    Link { key: String, url: Url },
    /// A bulk action ran through all of its items.
    BulkFinished { operation: Operation, summary: BulkSummary },
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(500);

    #[test]
    fn first_and_final_pages_always_emit() {
        let now = Instant::now();
        assert!(should_emit(Some(now), now, INTERVAL, true, false));
        assert!(should_emit(Some(now), now, INTERVAL, false, true));
    }

    #[test]
    fn middle_pages_wait_for_the_interval() {
        let start = Instant::now();
        assert!(!should_emit(Some(start), start + Duration::from_millis(499), INTERVAL, false, false));
        assert!(should_emit(Some(start), start + INTERVAL, INTERVAL, false, false));
        assert!(should_emit(None, start, INTERVAL, false, false));
    }

    #[test]
    fn throttle_tracks_last_emission() {
        let start = Instant::now();
        let mut throttle = UpdateThrottle::new(INTERVAL);
        assert!(throttle.check(start, true, false));
        assert!(!throttle.check(start + Duration::from_millis(100), false, false));
        assert!(!throttle.check(start + Duration::from_millis(400), false, false));
        assert!(throttle.check(start + Duration::from_millis(600), false, false));
        assert!(!throttle.check(start + Duration::from_millis(700), false, false));
        assert!(throttle.check(start + Duration::from_millis(701), false, true));
    }

    #[test]
    fn status_text() {
        assert_eq!(LoadStatus::CanceledAfter(200).to_string(), "Load canceled (200 objects loaded)");
        assert_eq!(LoadStatus::NoObjectsFound.to_string(), "No objects found");
        let loaded = LoadStatus::Loaded { count: 250, elapsed: Duration::from_millis(1250) };
        assert_eq!(loaded.to_string(), "Loaded 250 objects in 1.2s");
    }
}
