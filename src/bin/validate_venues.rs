//! Venue Validation Binary
//!
//! Validates the venue catalog before a scrape run:
//! - Checks required fields are filled in
//! - Checks booking URLs use http/https
//! - Checks every postcode resolves to a region

use anyhow::{Context, Result};
use std::path::Path;

use court_finder::config::load_config;
use court_finder::regions::UNKNOWN_REGION;
use court_finder::{BookingFamily, RegionIndex, VenueCatalog};

fn main() -> Result<()> {
    let root = std::env::var("ROOT").unwrap_or_else(|_| ".".to_string());

    println!("=== Venue Catalog Validator ===");

    let config = load_config(&root).context("Failed to load configuration")?;
    let catalog = match &config.venues_file {
        Some(path) => VenueCatalog::load(path).context("Failed to load venues file")?,
        None => VenueCatalog::builtin(),
    };
    let regions = if Path::new(&config.postcode_csv).exists() {
        RegionIndex::load(&config.postcode_csv)?
    } else {
        println!("Postcode CSV {:?} not found, using built-in regions", config.postcode_csv);
        RegionIndex::builtin()
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (key, venue) in catalog.iter() {
        if venue.name.trim().is_empty() {
            errors.push(format!("Venue '{}' has empty name", key));
        }

        if venue.url.is_empty() {
            errors.push(format!("Venue '{}' has empty URL", key));
        } else if !venue.url.starts_with("http://") && !venue.url.starts_with("https://") {
            errors.push(format!(
                "Venue '{}' has URL without http/https scheme: {}",
                key, venue.url
            ));
        }

        if venue.courts == 0 {
            errors.push(format!("Venue '{}' has no courts", key));
        }

        if regions.region_of(&venue.postcode) == UNKNOWN_REGION {
            warnings.push(format!(
                "Venue '{}' postcode {} is not in any region (only listed under All Regions)",
                key, venue.postcode
            ));
        }

        if venue.family == BookingFamily::ParklandsSports && venue.location.is_none() {
            warnings.push(format!(
                "Venue '{}' shares a Parklands schedule but has no location",
                key
            ));
        }
    }

    if errors.is_empty() && warnings.is_empty() {
        println!("✓ All {} venues are valid", catalog.len());
        return Ok(());
    }

    if !errors.is_empty() {
        println!("\n❌ ERRORS (must fix):");
        for error in &errors {
            println!("  - {}", error);
        }
    }

    if !warnings.is_empty() {
        println!("\n⚠️  WARNINGS:");
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }

    if !errors.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
