use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use chrono::NaiveDate;

use crate::types::{Snapshot, VenueResult};

/// `tennis-availability-2026-10-19.json`, or with the region appended as
/// `-Eastern-Suburbs` when the run was filtered.
pub fn snapshot_filename(date: NaiveDate, region: Option<&str>) -> String {
    let suffix = region
        .map(|r| format!("-{}", r.split_whitespace().collect::<Vec<_>>().join("-")))
        .unwrap_or_default();
    format!("tennis-availability-{}{}.json", date.format("%Y-%m-%d"), suffix)
}

/// Write the snapshot as a pretty-printed JSON array of venue results,
/// replacing any earlier snapshot for the same (date, region).
pub fn save_snapshot(dir: &Path, snapshot: &Snapshot) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let path = dir.join(snapshot_filename(snapshot.date, snapshot.region.as_deref()));
    let json = serde_json::to_string_pretty(&snapshot.results)
        .context("Failed to serialize snapshot")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write snapshot to {:?}", path))?;
    Ok(path)
}

/// The latest saved snapshot for (date, region), if there is one.
pub fn load_snapshot(
    dir: &Path,
    date: NaiveDate,
    region: Option<&str>,
) -> Result<Option<Snapshot>> {
    let path = dir.join(snapshot_filename(date, region));
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read snapshot from {:?}", path))?;
    let results: Vec<VenueResult> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot {:?}", path))?;

    Ok(Some(Snapshot {
        date,
        region: region.map(str::to_string),
        results,
    }))
}

/// `{dir}/{venueKey}-{date}.png`
pub fn screenshot_path(dir: &Path, venue_key: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}-{}.png", venue_key, date.format("%Y-%m-%d")))
}
