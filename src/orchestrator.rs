//! Scrape orchestration
//!
//! Selects venues, runs their pipelines in bounded concurrent groups and
//! gathers one result per venue. A venue's failure stays inside its own
//! result record; only an unreachable browser backend fails a run.

use crate::catalog::VenueCatalog;
use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::extract;
use crate::navigation::Navigator;
use crate::normalize::normalize_slots;
use crate::pacing::Pacer;
use crate::regions::{region_filter, RegionIndex};
use crate::session::{BrowserPage, SessionFactory, WebDriverSessionFactory};
use crate::storage;
use crate::types::{NavigationStatus, Slot, Snapshot, Venue, VenueResult};
use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::collections::VecDeque;
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, warn};

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

#[derive(Clone)]
pub struct Scraper {
    catalog: Arc<VenueCatalog>,
    regions: Arc<RegionIndex>,
    sessions: Arc<dyn SessionFactory>,
    config: Arc<ScraperConfig>,
    clock: Clock,
}

impl Scraper {
    pub fn new(
        catalog: VenueCatalog,
        regions: RegionIndex,
        sessions: Arc<dyn SessionFactory>,
        config: ScraperConfig,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            regions: Arc::new(regions),
            sessions,
            config: Arc::new(config),
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }

    /// Catalog, region table and ChromeDriver sessions as configured.
    pub fn from_config(config: ScraperConfig) -> Result<Self> {
        let catalog = match &config.venues_file {
            Some(path) => VenueCatalog::load(path)?,
            None => VenueCatalog::builtin(),
        };
        let regions = RegionIndex::load_or_default(&config.postcode_csv);
        let sessions = Arc::new(WebDriverSessionFactory::new(&config));
        Ok(Self::new(catalog, regions, sessions, config))
    }

    /// Replace the wall clock used for "today" and the future-slot cutoff.
    pub fn with_clock(
        mut self,
        clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static,
    ) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn catalog(&self) -> &VenueCatalog {
        &self.catalog
    }

    pub fn regions(&self) -> &RegionIndex {
        &self.regions
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Region names with venues, behind the "All Regions" sentinel.
    pub fn available_regions(&self) -> Vec<String> {
        self.regions.available_regions(&self.catalog)
    }

    /// Venue keys in scrape order: fastest booking families first, catalog
    /// order within a family.
    pub fn list_venues(&self, region: Option<&str>) -> Vec<String> {
        let filter = region_filter(region);
        let mut selected: Vec<(&str, &Venue)> = self
            .catalog
            .iter()
            .filter(|(_, venue)| match filter {
                Some(wanted) => self.regions.region_of(&venue.postcode) == wanted,
                None => true,
            })
            .collect();
        selected.sort_by_key(|(_, venue)| venue.family.priority());
        selected.into_iter().map(|(key, _)| key.to_string()).collect()
    }

    /// Scrape one venue. Every failure after the key lookup ends up in the
    /// returned record rather than in an `Err`.
    pub async fn scrape_venue(
        &self,
        key: &str,
        date: NaiveDate,
    ) -> Result<VenueResult, ScrapeError> {
        let venue = self
            .catalog
            .get(key)
            .ok_or_else(|| ScrapeError::UnknownVenue(key.to_string()))?;
        Ok(self.run_venue(key, venue, date).await)
    }

    async fn run_venue(&self, key: &str, venue: &Venue, date: NaiveDate) -> VenueResult {
        let region = self.regions.region_of(&venue.postcode);
        info!("Scraping {} ({})", venue.name, venue.family);

        match self.pipeline(key, venue, date).await {
            Ok((slots, navigation)) => {
                info!("{}: {} slots", venue.name, slots.len());
                VenueResult::success(key, venue, region, date, slots, navigation)
            }
            Err(e) => {
                warn!("{}: {}", venue.name, e);
                VenueResult::failure(key, venue, region, date, e.to_string())
            }
        }
    }

    /// Open a session, work the page, and close the session whatever
    /// happened in between.
    async fn pipeline(
        &self,
        key: &str,
        venue: &Venue,
        date: NaiveDate,
    ) -> Result<(Vec<Slot>, NavigationStatus), ScrapeError> {
        let page = match timeout(self.config.page_timeout(), self.sessions.open()).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => return Err(ScrapeError::Session(format!("{:#}", e))),
            Err(_) => {
                return Err(ScrapeError::Session(format!(
                    "no session after {}s",
                    self.config.page_timeout_secs
                )))
            }
        };

        let visit = self.visit(page.as_ref(), key, venue, date);
        let outcome = match timeout(self.config.venue_timeout(), visit).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ScrapeError::Timeout(self.config.venue_timeout_secs)),
        };

        if let Err(e) = page.close().await {
            warn!("{}: {:#}", venue.name, e);
        }
        outcome
    }

    async fn visit(
        &self,
        page: &dyn BrowserPage,
        key: &str,
        venue: &Venue,
        date: NaiveDate,
    ) -> Result<(Vec<Slot>, NavigationStatus), ScrapeError> {
        let pacer = self.pacer();
        let today = (self.clock)().date();

        let navigation = Navigator::new(page, pacer, self.config.post_nav_wait_ms)
            .open_on_date(venue, date, today)
            .await
            .map_err(|e| ScrapeError::Navigation(format!("{:#}", e)))?;

        pacer.pause(2000, 3000).await;
        let raw = extract::extract_availability(page, venue).await;
        let slots = normalize_slots(raw, date, (self.clock)());

        self.screenshot(page, key, date).await;
        Ok((slots, navigation))
    }

    async fn screenshot(&self, page: &dyn BrowserPage, key: &str, date: NaiveDate) {
        let Some(dir) = &self.config.screenshot_dir else {
            return;
        };
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("Could not create screenshot directory {:?}: {}", dir, e);
            return;
        }
        let path = storage::screenshot_path(dir, key, date);
        match page.screenshot(&path).await {
            Ok(()) => info!("Screenshot saved to {}", path.display()),
            Err(e) => warn!("{:#}", e),
        }
    }

    fn pacer(&self) -> Pacer {
        Pacer::new(self.config.pacing)
    }

    /// Scrape every venue in `region` (all venues for `None`/"all") and
    /// save the snapshot. Results keep the [`Scraper::list_venues`] order.
    pub async fn scrape_all(
        &self,
        date: NaiveDate,
        region: Option<&str>,
    ) -> Result<Snapshot, ScrapeError> {
        let started = Instant::now();
        let region = region_filter(region).map(str::to_string);
        let keys = self.list_venues(region.as_deref());

        info!(
            "Scraping {} venues for {} in {} ({} at a time)",
            keys.len(),
            date,
            region.as_deref().unwrap_or(crate::regions::ALL_REGIONS),
            self.config.max_concurrency
        );

        if !keys.is_empty() {
            self.sessions
                .preflight()
                .await
                .map_err(|e| ScrapeError::Environment(format!("{:#}", e)))?;
        } else {
            warn!("No venues found for the selected region");
        }

        let mut results = Vec::with_capacity(keys.len());
        let groups: Vec<&[String]> = keys.chunks(self.config.max_concurrency.max(1)).collect();

        for (number, group) in groups.iter().enumerate() {
            info!("Batch {}/{}: {}", number + 1, groups.len(), group.join(", "));
            results.extend(self.run_group(group, date).await);

            if number + 1 < groups.len() {
                let (min, max) = self.config.batch_delay_ms;
                self.pacer().pause(min, max).await;
            }
        }

        let snapshot = Snapshot {
            date,
            region,
            results,
        };

        let summary = snapshot.summary();
        info!(
            "Done in {:.2}s: {}/{} venues succeeded, {} slots",
            started.elapsed().as_secs_f64(),
            summary.successful,
            summary.total_venues,
            summary.total_slots
        );

        match storage::save_snapshot(&self.config.output_dir, &snapshot) {
            Ok(path) => info!("Saved {}", path.display()),
            Err(e) => error!("Could not save snapshot: {:#}", e),
        }

        Ok(snapshot)
    }

    /// Run one group concurrently and wait for all of it to settle.
    async fn run_group(&self, group: &[String], date: NaiveDate) -> Vec<VenueResult> {
        let mut tasks = JoinSet::new();
        for (position, key) in group.iter().enumerate() {
            let scraper = self.clone();
            let key = key.clone();
            tasks.spawn(async move {
                let result = match scraper.catalog.get(&key) {
                    Some(venue) => Some(scraper.run_venue(&key, venue, date).await),
                    None => None,
                };
                (position, result)
            });
        }

        let mut settled: Vec<Option<VenueResult>> = vec![None; group.len()];
        let mut aborted: VecDeque<String> = VecDeque::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, result)) => settled[position] = result,
                Err(e) => {
                    error!("Venue task ended abnormally: {}", e);
                    aborted.push_back(e.to_string());
                }
            }
        }

        group
            .iter()
            .zip(settled)
            .filter_map(|(key, result)| {
                result.or_else(|| {
                    let venue = self.catalog.get(key)?;
                    let reason = aborted
                        .pop_front()
                        .unwrap_or_else(|| "task did not finish".to_string());
                    Some(VenueResult::failure(
                        key,
                        venue,
                        self.regions.region_of(&venue.postcode),
                        date,
                        ScrapeError::Task(reason).to_string(),
                    ))
                })
            })
            .collect()
    }
}
