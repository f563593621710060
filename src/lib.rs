//! Court Finder Library
//!
//! Scrapes tennis court availability from venue booking sites and
//! aggregates it into per-date snapshots

pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod navigation;
pub mod normalize;
pub mod orchestrator;
pub mod pacing;
pub mod regions;
pub mod session;
pub mod storage;
pub mod types;

pub use catalog::VenueCatalog;
pub use config::ScraperConfig;
pub use error::ScrapeError;
pub use orchestrator::Scraper;
pub use regions::RegionIndex;
pub use types::*;
