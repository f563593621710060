//! Integration tests for the scrape orchestrator
//! Drives full runs against an in-memory browser serving fixture HTML pages

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use court_finder::extract::PageSnapshot;
use court_finder::session::{BrowserPage, ClickTarget, ElementInfo, SessionFactory};
use court_finder::storage::load_snapshot;
use court_finder::{
    BookingFamily, NavigationStatus, RegionIndex, ScrapeError, Scraper, ScraperConfig, Venue,
    VenueCatalog,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SCHEDULE: &str = r#"
<html><body>
<table>
  <tr><th>Time</th><th>Court 1</th><th>Court 2</th></tr>
  <tr>
    <td>6:00pm</td>
    <td><a href="/book/1">6:00pm</a></td>
    <td style="background-color: rgb(255, 165, 0)">Booked</td>
  </tr>
</table>
</body></html>
"#;

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    attempts: AtomicUsize,
}

struct FakeSessions {
    counters: Arc<Counters>,
    fail_open: bool,
    /// 1-based open attempt that fails, for single-venue session failures.
    fail_attempt: Option<usize>,
    backend_down: bool,
}

impl FakeSessions {
    fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            fail_open: false,
            fail_attempt: None,
            backend_down: false,
        }
    }
}

#[async_trait]
impl SessionFactory for FakeSessions {
    async fn preflight(&self) -> Result<()> {
        if self.backend_down {
            bail!("connection refused");
        }
        Ok(())
    }

    async fn open(&self) -> Result<Box<dyn BrowserPage>> {
        let attempt = self.counters.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_open {
            bail!("chrome crashed on startup");
        }
        if self.fail_attempt == Some(attempt) {
            bail!("session boom");
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            counters: self.counters.clone(),
            url: Mutex::new(String::new()),
        }))
    }
}

struct FakePage {
    counters: Arc<Counters>,
    url: Mutex<String>,
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if url.contains("stalled.example") {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if url.contains("broken.example") {
            bail!("net::ERR_CONNECTION_RESET at {}", url);
        }
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn elements(&self, _selector: &str) -> Result<Vec<ElementInfo>> {
        Ok(vec![])
    }

    async fn click(&self, _target: &ClickTarget) -> Result<bool> {
        Ok(false)
    }

    async fn capture(&self, _loose: Option<&str>) -> Result<PageSnapshot> {
        bail!("script execution unavailable")
    }

    async fn source(&self) -> Result<String> {
        Ok(SCHEDULE.to_string())
    }

    async fn screenshot(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

fn venue(name: &str, family: BookingFamily, url: &str, postcode: &str) -> Venue {
    Venue {
        name: name.to_string(),
        family,
        url: url.to_string(),
        address: format!("1 {} St", name),
        postcode: postcode.to_string(),
        phone: "(02) 9000 0000".to_string(),
        courts: 2,
        surface: "Hard Court".to_string(),
        location: None,
    }
}

#[rustfmt::skip]
fn catalog() -> VenueCatalog {
    VenueCatalog::new(vec![
        ("alpha".to_string(), venue("Alpha", BookingFamily::ColorTableB, "https://alpha.example/book.cfm", "2034")),
        ("bravo".to_string(), venue("Bravo", BookingFamily::ColorTableA, "https://bravo.example/booking", "2010")),
        ("charlie".to_string(), venue("Charlie", BookingFamily::ColorThresholdGrid, "https://charlie.example/grid.cfm", "2034")),
        ("delta".to_string(), venue("Delta", BookingFamily::ColorTableB, "https://broken.example/book.cfm", "2037")),
        ("echo".to_string(), venue("Echo", BookingFamily::ColorTableA, "https://echo.example/booking", "2025")),
    ])
    .unwrap()
}

fn regions() -> RegionIndex {
    RegionIndex::from_pairs([
        ("2034", "Eastern Suburbs"),
        ("2025", "Eastern Suburbs"),
        ("2010", "Inner City"),
        ("2037", "Inner West"),
    ])
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 18)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn tomorrow() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn scraper(sessions: FakeSessions, output: &Path, max_concurrency: usize) -> Scraper {
    let config = ScraperConfig {
        max_concurrency,
        pacing: false,
        output_dir: output.to_path_buf(),
        screenshot_dir: None,
        ..ScraperConfig::default()
    };
    Scraper::new(catalog(), regions(), Arc::new(sessions), config).with_clock(now)
}

#[tokio::test]
async fn test_one_result_per_listed_venue_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = scraper(FakeSessions::new(), dir.path(), 2);

    let listed = scraper.list_venues(None);
    assert_eq!(listed, vec!["bravo", "echo", "alpha", "delta", "charlie"]);

    let snapshot = scraper.scrape_all(tomorrow(), None).await.unwrap();
    let keys: Vec<&str> = snapshot.results.iter().map(|r| r.venue_key.as_str()).collect();
    assert_eq!(keys, listed);
    assert!(snapshot.results.iter().all(|r| r.date == tomorrow()));
}

#[tokio::test]
async fn test_failing_venue_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = scraper(FakeSessions::new(), dir.path(), 8);

    let snapshot = scraper.scrape_all(tomorrow(), None).await.unwrap();

    let delta = snapshot.results.iter().find(|r| r.venue_key == "delta").unwrap();
    assert!(!delta.success);
    assert!(delta.available_slots.is_empty());
    assert!(delta.error.as_deref().unwrap().contains("ERR_CONNECTION_RESET"));

    for result in snapshot.results.iter().filter(|r| r.venue_key != "delta") {
        assert!(result.success, "{} failed: {:?}", result.venue_key, result.error);
        assert_eq!(result.available_slots.len(), 1, "{}", result.venue_key);
        let slot = &result.available_slots[0];
        assert_eq!(slot.time, "18:00");
        assert_eq!(slot.court, "Court 1");
    }

    let summary = snapshot.summary();
    assert_eq!(summary.total_venues, 5);
    assert_eq!(summary.successful, 4);
    assert_eq!(summary.total_slots, 4);
}

#[tokio::test]
async fn test_navigation_status_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = scraper(FakeSessions::new(), dir.path(), 8);
    let snapshot = scraper.scrape_all(tomorrow(), None).await.unwrap();

    let status = |key: &str| {
        snapshot
            .results
            .iter()
            .find(|r| r.venue_key == key)
            .and_then(|r| r.navigation)
    };
    assert_eq!(status("alpha"), Some(NavigationStatus::DirectUrl));
    assert_eq!(status("bravo"), Some(NavigationStatus::Uncertain));
    assert_eq!(status("delta"), None);

    let bravo = snapshot.results.iter().find(|r| r.venue_key == "bravo").unwrap();
    assert_eq!(
        bravo.available_slots[0].booking_url.as_deref(),
        Some("https://bravo.example/book/1")
    );
}

#[tokio::test]
async fn test_concurrency_bound_and_sessions_closed() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = FakeSessions::new();
    let counters = sessions.counters.clone();
    let scraper = scraper(sessions, dir.path(), 2);

    scraper.scrape_all(tomorrow(), None).await.unwrap();

    assert!(counters.peak.load(Ordering::SeqCst) <= 2);
    assert!(counters.peak.load(Ordering::SeqCst) >= 1);
    assert_eq!(counters.opened.load(Ordering::SeqCst), 5);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 5);
    assert_eq!(counters.active.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_region_filter_and_persisted_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = scraper(FakeSessions::new(), dir.path(), 8);

    assert_eq!(scraper.list_venues(Some("Eastern Suburbs")), vec!["echo", "alpha", "charlie"]);

    let snapshot = scraper.scrape_all(tomorrow(), Some("Eastern Suburbs")).await.unwrap();
    assert_eq!(snapshot.results.len(), 3);
    assert!(snapshot.results.iter().all(|r| r.region == "Eastern Suburbs"));

    let saved = load_snapshot(dir.path(), tomorrow(), Some("Eastern Suburbs"))
        .unwrap()
        .expect("snapshot file written");
    assert_eq!(saved.results, snapshot.results);
    assert!(dir
        .path()
        .join("tennis-availability-2026-10-19-Eastern-Suburbs.json")
        .exists());

    let everything = scraper.scrape_all(tomorrow(), Some("All Regions")).await.unwrap();
    assert_eq!(everything.results.len(), 5);
    assert!(everything.region.is_none());
}

#[tokio::test]
async fn test_session_failures_become_records() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = FakeSessions {
        fail_open: true,
        ..FakeSessions::new()
    };
    let scraper = scraper(sessions, dir.path(), 3);

    let snapshot = scraper.scrape_all(tomorrow(), None).await.unwrap();
    assert_eq!(snapshot.results.len(), 5);
    for result in &snapshot.results {
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("chrome crashed"));
    }
}

#[tokio::test]
async fn test_unreachable_backend_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = FakeSessions {
        backend_down: true,
        ..FakeSessions::new()
    };
    let scraper = scraper(sessions, dir.path(), 8);

    let err = scraper.scrape_all(tomorrow(), None).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Environment(_)));
    assert!(load_snapshot(dir.path(), tomorrow(), None).unwrap().is_none());
}

#[tokio::test]
async fn test_one_bad_venue_does_not_sink_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = FakeSessions {
        fail_attempt: Some(2),
        ..FakeSessions::new()
    };
    let counters = sessions.counters.clone();
    let venues = [("a", "a"), ("b", "b"), ("c", "stalled"), ("d", "d")]
        .into_iter()
        .map(|(key, host)| {
            let url = format!("https://{}.example/booking", host);
            let entry = venue(&key.to_uppercase(), BookingFamily::ColorTableA, &url, "2034");
            (key.to_string(), entry)
        })
        .collect();
    let catalog = VenueCatalog::new(venues).unwrap();
    let config = ScraperConfig {
        max_concurrency: 1,
        venue_timeout_secs: 1,
        pacing: false,
        output_dir: dir.path().to_path_buf(),
        screenshot_dir: None,
        ..ScraperConfig::default()
    };
    let scraper = Scraper::new(catalog, regions(), Arc::new(sessions), config).with_clock(now);

    let snapshot = scraper.scrape_all(tomorrow(), None).await.unwrap();
    let outcome: Vec<(&str, bool, Option<&str>)> = snapshot
        .results
        .iter()
        .map(|r| (r.venue_key.as_str(), r.success, r.error.as_deref()))
        .collect();
    assert_eq!(
        outcome,
        vec![
            ("a", true, None),
            ("b", false, Some("Failed to open browser session: session boom")),
            ("c", false, Some("Scrape timed out after 1s")),
            ("d", true, None),
        ]
    );
    assert_eq!(snapshot.results[3].available_slots.len(), 1);

    // The stalled venue's session is still torn down.
    assert_eq!(counters.opened.load(Ordering::SeqCst), 3);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 3);
    assert_eq!(counters.active.load(Ordering::SeqCst), 0);
}
