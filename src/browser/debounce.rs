use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Restart-on-change delayed action.
///
/// Holds the latest pending value and the instant it becomes due. The owner
/// polls it with its own notion of "now", so it works the same from a frame
/// loop, an async loop or a test.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, pending: None }
    }

    /// Replaces any pending value and pushes the deadline out.
    pub fn restart(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.quiet));
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    /// Hands out the pending value once its quiet period has elapsed.
    pub fn fire_if_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, due)) if now >= *due => self.cancel(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(300));
        debounce.restart("a", start);
        assert_eq!(debounce.fire_if_due(start + Duration::from_millis(299)), None);
        assert_eq!(debounce.fire_if_due(start + Duration::from_millis(300)), Some("a"));
        assert!(!debounce.is_pending());
        assert_eq!(debounce.fire_if_due(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn restart_replaces_value_and_deadline() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(300));
        debounce.restart("r", start);
        debounce.restart("re", start + Duration::from_millis(200));
        debounce.restart("rep", start + Duration::from_millis(400));
        assert_eq!(debounce.fire_if_due(start + Duration::from_millis(600)), None);
        assert_eq!(debounce.deadline(), Some(start + Duration::from_millis(700)));
        assert_eq!(debounce.fire_if_due(start + Duration::from_millis(700)), Some("rep"));
    }

    #[test]
    fn cancel_discards_pending_value() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(10));
        debounce.restart(1, start);
        assert_eq!(debounce.cancel(), Some(1));
        assert_eq!(debounce.fire_if_due(start + Duration::from_secs(1)), None);
    }
}
