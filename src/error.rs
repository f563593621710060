use thiserror::Error;

/// Failures that can end a venue scrape, plus the one environment failure
/// that ends a whole run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Failed to open browser session: {0}")]
    Session(String),

    #[error("Failed to load booking page: {0}")]
    Navigation(String),

    #[error("Scrape timed out after {0}s")]
    Timeout(u64),

    #[error("Venue task aborted: {0}")]
    Task(String),

    #[error("Browser backend unavailable: {0}")]
    Environment(String),

    #[error("Unknown venue: {0}")]
    UnknownVenue(String),
}

impl ScrapeError {
    /// Whether the error is confined to a single venue.
    pub fn is_venue_scoped(&self) -> bool {
        !matches!(self, ScrapeError::Environment(_))
    }
}
