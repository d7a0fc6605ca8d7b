use super::*;
use crate::store::memory::MemoryStore;
use tokio::time::timeout;

fn settings(batch_size: usize) -> BrowserSettings {
    BrowserSettings {
        batch_size,
        max_objects: 0,
        ..BrowserSettings::default()
    }
}

fn browser(store: &Arc<MemoryStore>, batch_size: usize) -> Browser {
    Browser::new(store.clone(), Handle::current(), settings(batch_size))
}

async fn settle(browser: &mut Browser) {
    timeout(Duration::from_secs(5), browser.wait_idle())
        .await
        .expect("browser did not settle");
}

fn visible_keys(browser: &Browser) -> Vec<String> {
    browser.visible_objects().map(|o| o.key.clone()).collect()
}

fn last_progress(notifications: &[Notification]) -> Option<&LoadProgress> {
    notifications.iter().rev().find_map(|n| match n {
        Notification::Progress(p) => Some(p),
        _ => None,
    })
}

fn prefix(p: &str) -> Scope {
    Scope::Prefix(p.to_string())
}

#[tokio::test]
async fn load_stops_at_ceiling_and_offers_more() {
    let store = Arc::new(MemoryStore::sequential(1000));
    let mut browser = browser(&store, 100);

    browser.start_load("", Some(250));
    settle(&mut browser).await;

    assert_eq!(browser.index().len(), 250);
    assert_eq!(store.list_calls(), 3);
    assert!(browser.has_more());
    assert!(matches!(browser.status(), LoadStatus::Loaded { count: 250, .. }));
    let notifications: Vec<_> = browser.drain_notifications().collect();
    let progress = last_progress(&notifications).unwrap();
    assert_eq!(progress.total_loaded, 250);
    assert!(progress.has_more);
    assert!(browser.items_label().starts_with("Total Items: 250 (limited to 250"));

    assert!(browser.continue_load().is_some());
    settle(&mut browser).await;
    assert_eq!(browser.index().len(), 500);
    assert_eq!(browser.index().objects()[250].key, "obj0250");
    assert!(browser.has_more());
}

#[tokio::test]
async fn continue_is_refused_unless_ceiling_was_hit() {
    let store = Arc::new(MemoryStore::sequential(120));
    let mut browser = browser(&store, 50);

    browser.start_load("", Some(500));
    assert!(browser.continue_load().is_none(), "load still running");
    settle(&mut browser).await;

    assert_eq!(browser.index().len(), 120);
    assert!(!browser.has_more());
    assert!(browser.continue_load().is_none());
    assert_eq!(browser.items_label(), "Total Items: 120");
}

#[tokio::test]
async fn prefixes_feed_tree_and_scope() {
    let store = Arc::new(MemoryStore::with_keys(["a/1.txt", "a/2.txt", "b/1.txt"]));
    let mut browser = browser(&store, 500);

    browser.start_load("", None);
    settle(&mut browser).await;

    assert_eq!(browser.index().prefixes().collect::<Vec<_>>(), ["a", "b"]);
    assert_eq!(browser.tree().children(&Scope::Root), [prefix("a"), prefix("b")]);

    browser.select_scope(prefix("a"));
    assert_eq!(visible_keys(&browser), ["a/1.txt", "a/2.txt"]);
    assert_eq!(browser.items_label(), "Items: 2 of 3 total");

    browser.select_scope(Scope::Root);
    assert_eq!(browser.visible_len(), 3);
}

#[tokio::test]
async fn search_waits_for_quiet_period() {
    let store = Arc::new(MemoryStore::with_keys(["a/1.txt", "a/2.txt", "b/1.txt"]));
    let mut browser = browser(&store, 500);
    browser.start_load("", None);
    settle(&mut browser).await;

    browser.set_search_term("1");
    browser.set_search_term("2");
    browser.pump();
    assert_eq!(browser.visible_len(), 3, "search applied before the quiet period");

    assert!(browser.tick(Instant::now() + Duration::from_secs(1)));
    assert_eq!(visible_keys(&browser), ["a/2.txt"]);
    assert_eq!(browser.view().search_term, "2");
}

#[tokio::test]
async fn queued_search_applies_while_idle() {
    let store = Arc::new(MemoryStore::with_keys(["docs/Report.pdf", "img/cat.png"]));
    let mut browser = browser(&store, 500);
    browser.start_load("", None);
    settle(&mut browser).await;

    browser.set_search_term("REPORT");
    settle(&mut browser).await;
    assert_eq!(visible_keys(&browser), ["docs/Report.pdf"]);
}

#[tokio::test]
async fn cancel_freezes_the_index() {
    let store = Arc::new(MemoryStore::sequential(500).stall_after(2));
    let mut browser = browser(&store, 100);

    browser.start_load("", None);
    timeout(Duration::from_secs(5), async {
        while browser.index().len() < 200 {
            browser.process_next().await;
        }
    })
    .await
    .expect("first two pages never arrived");

    browser.cancel_load();
    assert!(!browser.is_loading());
    assert_eq!(browser.status(), &LoadStatus::CanceledAfter(200));
    assert_eq!(browser.status().to_string(), "Load canceled (200 objects loaded)");

    tokio::time::sleep(Duration::from_millis(50)).await;
    browser.pump();
    assert_eq!(browser.index().len(), 200);
    assert!(store.list_calls() <= 3);
    assert_eq!(browser.status(), &LoadStatus::CanceledAfter(200));
    assert!(!browser.has_more());
}

#[tokio::test]
async fn canceling_through_the_handle_finishes_the_load() {
    let store = Arc::new(MemoryStore::sequential(500).stall_after(1));
    let mut browser = browser(&store, 100);

    let handle = browser.start_load("", None);
    timeout(Duration::from_secs(5), async {
        while browser.index().len() < 100 {
            browser.process_next().await;
        }
    })
    .await
    .unwrap();
    handle.cancel();
    settle(&mut browser).await;

    assert_eq!(browser.status(), &LoadStatus::CanceledAfter(100));
}

#[tokio::test]
async fn restarting_discards_the_superseded_load() {
    let store = Arc::new(MemoryStore::sequential(300));
    let mut browser = browser(&store, 50);

    let first = browser.start_load("", None);
    let second = browser.start_load("", None);
    assert!(first.is_canceled());
    assert!(first.id < second.id);
    settle(&mut browser).await;

    assert_eq!(browser.index().len(), 300);
    assert!(matches!(browser.status(), LoadStatus::Loaded { count: 300, .. }));
}

#[tokio::test]
async fn pages_of_a_superseded_load_are_dropped() {
    let store = Arc::new(MemoryStore::sequential(10).stall_after(0));
    let mut browser = browser(&store, 50);

    let first = browser.start_load("", None);
    let second = browser.start_load("", None);
    browser
        .tx
        .send(WorkerEvent::Page {
            id: first.id,
            records: vec![crate::store::ObjectRecord::new("late/page.txt", 1, chrono::Utc::now())],
            refresh: true,
        })
        .unwrap();
    browser
        .tx
        .send(WorkerEvent::Finished {
            id: first.id,
            outcome: super::loader::LoadOutcome::Exhausted,
        })
        .unwrap();
    browser.drain_notifications().for_each(drop);
    assert!(browser.pump());

    assert!(browser.index().is_empty());
    assert!(browser.tree().children(&Scope::Root).is_empty());
    assert!(browser.is_loading());
    assert!(matches!(browser.status(), LoadStatus::Loading { loaded: 0 }));
    assert_eq!(browser.drain_notifications().count(), 0);

    browser.cancel_load();
    assert!(second.is_canceled());
    assert_eq!(browser.status(), &LoadStatus::CanceledAfter(0));
}

#[tokio::test]
async fn fetch_error_keeps_partial_results() {
    let store = Arc::new(MemoryStore::sequential(500).fail_on_call(2));
    let mut browser = browser(&store, 100);

    browser.start_load("", None);
    settle(&mut browser).await;

    assert_eq!(browser.index().len(), 100);
    let LoadStatus::Failed(message) = browser.status() else {
        panic!("expected a failed load, got {:?}", browser.status());
    };
    assert!(message.contains("503"));
    let errors: Vec<_> = browser
        .drain_notifications()
        .filter(|n| matches!(n, Notification::Error(BrowseError::Fetch(_))))
        .collect();
    assert_eq!(errors.len(), 1);
}

#[tokio::test]
async fn worker_panic_is_contained() {
    let store = Arc::new(MemoryStore::sequential(500).panic_on_call(1));
    let mut browser = browser(&store, 100);

    browser.start_load("", None);
    settle(&mut browser).await;
    assert!(matches!(browser.status(), LoadStatus::Failed(m) if m.contains("panicked")));

    // only the first call panics, so a retry loads normally
    browser.start_load("", None);
    settle(&mut browser).await;
    assert_eq!(browser.index().len(), 500);
}

#[tokio::test]
async fn empty_listing_reports_no_objects() {
    let store = Arc::new(MemoryStore::default());
    let mut browser = browser(&store, 100);

    browser.start_load("nothing/", None);
    settle(&mut browser).await;
    assert_eq!(browser.status(), &LoadStatus::NoObjectsFound);
    assert_eq!(browser.base_prefix(), "nothing/");
}

#[tokio::test]
async fn view_changes_clear_the_selection() {
    let store = Arc::new(MemoryStore::with_keys(["a/1.txt", "a/2.txt", "b/1.txt"]));
    let mut browser = browser(&store, 500);
    browser.start_load("", None);
    settle(&mut browser).await;

    browser.toggle_select(0);
    browser.toggle_select(2);
    assert_eq!(browser.selection().count(), 2);
    browser.apply_search_now("txt");
    assert_eq!(browser.selection().count(), 0);

    browser.toggle_select(1);
    browser.select_scope(prefix("b"));
    assert_eq!(browser.selection().count(), 0);

    browser.toggle_select(0);
    browser.start_load("", None);
    assert_eq!(browser.selection().count(), 0);
    assert!(!browser.toggle_select(99));
}

#[tokio::test]
async fn bulk_delete_reports_missing_object_and_continues() {
    let store = Arc::new(MemoryStore::with_keys(["a/1.txt", "a/2.txt", "b/1.txt"]));
    let mut browser = browser(&store, 500);
    browser.start_load("", None);
    settle(&mut browser).await;
    store.delete("a/2.txt").await.unwrap();

    for row in 0..3 {
        browser.toggle_select(row);
    }
    browser.drain_notifications().for_each(drop);
    assert_eq!(browser.delete_selected(), 3);
    settle(&mut browser).await;

    assert_eq!(visible_keys(&browser), ["a/2.txt"]);
    assert!(!browser.index().has_prefix("b"));
    let notifications: Vec<_> = browser.drain_notifications().collect();
    let failed: Vec<_> = notifications
        .iter()
        .filter_map(|n| match n {
            Notification::Error(BrowseError::Item { key, .. }) => Some(key.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(failed, ["a/2.txt"]);
    assert!(notifications.iter().any(|n| matches!(
        n,
        Notification::BulkFinished {
            operation: Operation::Delete,
            summary: BulkSummary { succeeded: 2, failed: 1 },
        }
    )));
}

#[tokio::test]
async fn upload_into_selected_directory_reloads() {
    let store = Arc::new(MemoryStore::with_keys(["a/1.txt"]));
    let mut browser = browser(&store, 500);
    browser.start_load("", None);
    settle(&mut browser).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("new.txt");
    std::fs::write(&path, "fresh").unwrap();

    browser.select_scope(prefix("a"));
    browser.upload_file(path, None);
    settle(&mut browser).await;

    assert_eq!(store.content("a/new.txt").unwrap(), "fresh");
    assert_eq!(visible_keys(&browser), ["a/1.txt", "a/new.txt"]);
}

#[tokio::test]
async fn download_and_link_selected_rows() {
    let store = Arc::new(MemoryStore::with_keys(["a/1.txt", "b/2.txt"]));
    let mut browser = browser(&store, 500);
    browser.start_load("", None);
    settle(&mut browser).await;

    let dir = tempfile::tempdir().unwrap();
    browser.toggle_select(1);
    assert_eq!(browser.download_selected(dir.path().to_path_buf()), 1);
    assert!(browser.get_link(0, Some(Duration::from_secs(90))));
    settle(&mut browser).await;

    assert_eq!(
        std::fs::read_to_string(dir.path().join("2.txt")).unwrap(),
        "content of b/2.txt"
    );
    let link = browser.drain_notifications().find_map(|n| match n {
        Notification::Link { key, url } => Some((key, url)),
        _ => None,
    });
    let (key, url) = link.unwrap();
    assert_eq!(key, "a/1.txt");
    assert_eq!(url.query(), Some("X-Amz-Expires=90"));
}

#[tokio::test]
async fn commands_drive_the_browser() {
    let store = Arc::new(MemoryStore::with_keys(["a/1.txt", "a/2.txt", "b/1.txt"]));
    let mut browser = browser(&store, 500);

    browser.handle(Command::StartLoad {
        prefix: String::new(),
        ceiling: None,
    });
    settle(&mut browser).await;
    browser.handle(Command::SelectScope(prefix("a")));
    browser.handle(Command::ToggleSelect(1));
    assert_eq!(browser.selected_keys(), ["a/2.txt"]);
    browser.handle(Command::SetSearchTerm("1".into()));
    browser.flush_search();
    assert_eq!(visible_keys(&browser), ["a/1.txt"]);
    assert!(browser.selection().is_empty());
}
