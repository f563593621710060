//! Scraper configuration
//!
//! Loaded from an optional YAML file under the project root; every field has
//! a default so an empty or missing file yields a working configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "court_finder.yml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// ChromeDriver endpoint.
    pub webdriver_url: String,
    pub headless: bool,
    /// Venue pipelines running at the same time.
    pub max_concurrency: usize,
    /// Page load / script timeout inside a session.
    pub page_timeout_secs: u64,
    /// Upper bound for one venue's whole pipeline.
    pub venue_timeout_secs: u64,
    pub viewport: Viewport,
    /// Randomized human-like waits. Off in tests.
    pub pacing: bool,
    pub post_nav_wait_ms: u64,
    pub batch_delay_ms: (u64, u64),
    pub output_dir: PathBuf,
    pub screenshot_dir: Option<PathBuf>,
    pub postcode_csv: PathBuf,
    pub venues_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            max_concurrency: 8,
            page_timeout_secs: 60,
            venue_timeout_secs: 180,
            viewport: Viewport::default(),
            pacing: true,
            post_nav_wait_ms: 2000,
            batch_delay_ms: (2000, 3000),
            output_dir: PathBuf::from("."),
            screenshot_dir: Some(PathBuf::from("screenshots")),
            postcode_csv: PathBuf::from("sydneypostcodes.csv"),
            venues_file: None,
        }
    }
}

impl ScraperConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn venue_timeout(&self) -> Duration {
        Duration::from_secs(self.venue_timeout_secs)
    }

    /// Resolve relative paths against the project root.
    pub fn rooted(mut self, root: &Path) -> Self {
        let join = |p: &PathBuf| if p.is_absolute() { p.clone() } else { root.join(p) };
        self.output_dir = join(&self.output_dir);
        self.postcode_csv = join(&self.postcode_csv);
        self.screenshot_dir = self.screenshot_dir.as_ref().map(join);
        self.venues_file = self.venues_file.as_ref().map(join);
        self
    }

    fn validate(self) -> Result<Self> {
        anyhow::ensure!(self.max_concurrency > 0, "max_concurrency must be at least 1");
        anyhow::ensure!(
            self.batch_delay_ms.0 <= self.batch_delay_ms.1,
            "batch_delay_ms range is inverted: {:?}",
            self.batch_delay_ms
        );
        Ok(self)
    }
}

/// Load `court_finder.yml` from `root`, or defaults when the file is absent.
pub fn load_config(root: &str) -> Result<ScraperConfig> {
    let path = PathBuf::from(root).join(CONFIG_FILE);
    if !path.exists() {
        return ScraperConfig::default().rooted(Path::new(root)).validate();
    }
    load_config_from(&path)?.rooted(Path::new(root)).validate()
}

pub fn load_config_from(path: &Path) -> Result<ScraperConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {:?}", path))?;
    if content.trim().is_empty() {
        return Ok(ScraperConfig::default());
    }
    let config: ScraperConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config YAML {:?}", path))?;
    config.validate()
}
