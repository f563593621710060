//! Postcode → region lookup
//!
//! Built once at startup from the postcode reference CSV
//! (`postcode,suburbs,region`). Read-only afterwards.

use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::catalog::VenueCatalog;

pub const UNKNOWN_REGION: &str = "Unknown";
pub const ALL_REGIONS: &str = "All Regions";

const PO_BOXES: &str = "(PO Boxes)";

/// Used when the reference CSV cannot be read.
const DEFAULT_REGIONS: &[(&str, &str)] = &[
    ("2010", "Inner City"),
    ("2015", "Inner South"),
    ("2018", "Inner South"),
    ("2021", "Eastern Suburbs"),
    ("2022", "Eastern Suburbs"),
    ("2025", "Eastern Suburbs"),
    ("2026", "Eastern Suburbs"),
    ("2030", "Eastern Suburbs"),
    ("2031", "Eastern Suburbs"),
    ("2032", "Eastern Suburbs"),
    ("2033", "Eastern Suburbs"),
    ("2034", "Eastern Suburbs"),
    ("2035", "Eastern Suburbs"),
    ("2037", "Inner West"),
];

#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    regions: HashMap<String, String>,
}

impl RegionIndex {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            regions: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::from_pairs(DEFAULT_REGIONS.iter().copied())
    }

    /// Parse CSV text. The first line is a header; quoted fields may contain
    /// commas. Rows for PO boxes are skipped.
    pub fn from_csv(content: &str) -> Self {
        let mut regions = HashMap::new();

        for line in content.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let fields = split_csv_line(line);
            if fields.len() < 3 {
                continue;
            }

            let postcode = &fields[0];
            let region = &fields[2];
            if !postcode.is_empty() && !region.is_empty() && region != PO_BOXES {
                regions.insert(postcode.clone(), region.clone());
            }
        }

        Self { regions }
    }

    /// Load from `path`, falling back to the built-in table on any read error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(index) => {
                info!(
                    "Loaded {} postcodes mapping to {} regions from {:?}",
                    index.len(),
                    index.region_names().len(),
                    path
                );
                index
            }
            Err(e) => {
                warn!("Could not load postcode regions ({:#}), using built-in defaults", e);
                Self::builtin()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read postcode CSV from {:?}", path))?;
        let index = Self::from_csv(&content);
        anyhow::ensure!(!index.is_empty(), "Postcode CSV {:?} has no usable rows", path);
        Ok(index)
    }

    /// Region for `postcode`, or `"Unknown"`.
    pub fn region_of(&self, postcode: &str) -> &str {
        self.regions
            .get(postcode.trim())
            .map(String::as_str)
            .unwrap_or(UNKNOWN_REGION)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn region_names(&self) -> BTreeSet<&str> {
        self.regions.values().map(String::as_str).collect()
    }

    /// Distinct regions that contain at least one catalog venue, sorted,
    /// with the "All Regions" sentinel first.
    pub fn available_regions(&self, catalog: &VenueCatalog) -> Vec<String> {
        let present: BTreeSet<&str> = catalog
            .iter()
            .map(|(_, venue)| self.region_of(&venue.postcode))
            .filter(|region| *region != UNKNOWN_REGION)
            .collect();

        std::iter::once(ALL_REGIONS)
            .chain(present)
            .map(str::to_string)
            .collect()
    }
}

/// Normalize a caller's region filter: empty, `all` and `All Regions` mean
/// no filter.
pub fn region_filter(region: Option<&str>) -> Option<&str> {
    match region.map(str::trim) {
        None | Some("") => None,
        Some(r) if r.eq_ignore_ascii_case("all") || r == ALL_REGIONS => None,
        Some(r) => Some(r),
    }
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "postcode,suburbs,region\n\
        2000,\"Sydney, Haymarket, The Rocks\",Sydney City\n\
        2034,\"Coogee, South Coogee\",Eastern Suburbs\n\
        2001,Sydney,(PO Boxes)\n\
        \n\
        2037,\"Glebe, Forest Lodge\",Inner West\n";

    #[test]
    fn test_quoted_fields_with_commas() {
        let index = RegionIndex::from_csv(CSV);
        assert_eq!(index.region_of("2000"), "Sydney City");
        assert_eq!(index.region_of("2034"), "Eastern Suburbs");
        assert_eq!(index.region_of("2037"), "Inner West");
    }

    #[test]
    fn test_po_boxes_and_unknown() {
        let index = RegionIndex::from_csv(CSV);
        assert_eq!(index.region_of("2001"), UNKNOWN_REGION);
        assert_eq!(index.region_of("9999"), UNKNOWN_REGION);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let index = RegionIndex::load_or_default(Path::new("/nonexistent/postcodes.csv"));
        assert_eq!(index.region_of("2021"), "Eastern Suburbs");
        assert_eq!(index.region_of("2010"), "Inner City");
    }

    #[test]
    fn test_region_filter_sentinels() {
        assert_eq!(region_filter(None), None);
        assert_eq!(region_filter(Some("all")), None);
        assert_eq!(region_filter(Some("All Regions")), None);
        assert_eq!(region_filter(Some("  ")), None);
        assert_eq!(region_filter(Some("Inner West")), Some("Inner West"));
    }

    #[test]
    fn test_available_regions_sorted_with_sentinel() {
        let index = RegionIndex::builtin();
        let regions = index.available_regions(&VenueCatalog::builtin());
        assert_eq!(regions[0], ALL_REGIONS);
        assert_eq!(
            &regions[1..],
            &["Eastern Suburbs", "Inner City", "Inner South", "Inner West"]
        );
    }
}
