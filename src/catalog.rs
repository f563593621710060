//! Venue catalog
//!
//! Process-wide, read-only list of venues keyed by a short identifier.
//! Insertion order is preserved so ties in family priority keep catalog order.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::types::{BookingFamily, Venue};

#[derive(Debug, Clone, Default)]
pub struct VenueCatalog {
    venues: Vec<(String, Venue)>,
}

#[derive(Debug, Deserialize, Serialize)]
struct VenuesFile {
    venues: Vec<VenueEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
struct VenueEntry {
    key: String,
    #[serde(flatten)]
    venue: Venue,
}

impl VenueCatalog {
    pub fn new(venues: Vec<(String, Venue)>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for (key, _) in &venues {
            anyhow::ensure!(seen.insert(key.as_str()), "Duplicate venue key: {}", key);
        }
        Ok(Self { venues })
    }

    pub fn get(&self, key: &str) -> Option<&Venue> {
        self.venues.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Venue)> {
        self.venues.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.venues.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    /// Parse a `venues:` YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: VenuesFile =
            serde_yaml::from_str(content).context("Failed to parse venues YAML")?;
        Self::new(file.venues.into_iter().map(|e| (e.key, e.venue)).collect())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read venues from {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid venues file {:?}", path))
    }

    /// The Sydney venues the scraper ships with.
    #[rustfmt::skip]
    pub fn builtin() -> Self {
        let venues = vec![
            venue("coogeeBeach", "Coogee Beach Tennis", BookingFamily::ColorTableA,
                "https://www.tennisvenues.com.au/booking/eastern-suburbs-tennis-club",
                "Cnr Bream & Brook St, Coogee NSW 2034", "2034", "(02) 9665 7360", 5, "Synthetic Grass"),
            venue("lathamPark", "Latham Park Tennis Centre", BookingFamily::ColorTableA,
                "https://www.tennisvenues.com.au/booking/latham-park-tc",
                "3 Henning Ave, South Coogee NSW 2034", "2034", "(02) 9344 3350", 6, "Synthetic Grass/Hard"),
            venue("eastsideTennis", "Eastside Tennis Centre", BookingFamily::ColorTableA,
                "https://www.tennisvenues.com.au/booking/eastside-tennis-centre?mobileViewDisabled=true",
                "1 Court Ave, Kingsford NSW 2032", "2032", "0493 496 426", 8, "Synthetic/Hard/Clay"),
            venue("snapePark", "Snape Park Tennis Club", BookingFamily::ColorTableA,
                "https://www.tennisvenues.com.au/booking/snape-park-tc",
                "15 Snape Street, Maroubra NSW 2035", "2035", "(02) 9344 3424", 6, "Synthetic Grass/Hard"),
            venue("cooperPark", "Cooper Park Tennis Club", BookingFamily::ColorTableA,
                "https://www.tennisvenues.com.au/booking/cooper-park-tc",
                "1 Bunna Place (off Suttie Road), Woollahra NSW 2025", "2025", "(02) 9389 3100", 8, "Synthetic Grass"),
            venue("jensensPaddington", "Prince Alfred Park", BookingFamily::ColorTableB,
                "https://jensenstennis.intrac.com.au/tennis/book.cfm?facility=1",
                "Chalmers Street, Prince Alfred Park, Surry Hills NSW 2010", "2010", "(02) 9331 3114", 4, "Synthetic Grass"),
            venue("jensensCentennial", "Alexandria", BookingFamily::ColorTableB,
                "https://jensenstennis.intrac.com.au/tennis/book.cfm?facility=2",
                "Park Road, Alexandria Park, Alexandria NSW 2015", "2015", "(02) 9331 3114", 6, "Synthetic Grass"),
            venue("jensensCoogee", "Beaconsfield", BookingFamily::ColorTableB,
                "https://jensenstennis.intrac.com.au/tennis/book.cfm?facility=3",
                "William Street, Beaconsfield Park, Beaconsfield NSW 2015", "2015", "(02) 9331 3114", 4, "Synthetic Grass"),
            venue("jensensRandwick", "Glebe", BookingFamily::ColorTableB,
                "https://jensenstennis.intrac.com.au/tennis/book.cfm?facility=4",
                "John Street, St James Park, Glebe NSW 2037", "2037", "(02) 9331 3114", 4, "Synthetic Grass"),
            venue("jensensClovelly", "Rosebery", BookingFamily::ColorTableB,
                "https://jensenstennis.intrac.com.au/tennis/book.cfm?location=6&court=283",
                "Corner of Rothschild Avenue and Hayes Road, Turruwul Park, Rosebery NSW 2018", "2018", "(02) 9331 3114", 4, "Synthetic Grass"),
            venue("trumperPark", "Trumper Park", BookingFamily::ColorTableB,
                "https://wentworthtennis.intrac.com.au/tennis/book.cfm",
                "Trumper Park, Quarry St, Paddington NSW 2021", "2021", "(02) 9363 4955", 8, "Hard Court"),
            located(venue("centennialParklands", "Centennial Parklands", BookingFamily::ColorThresholdGrid,
                "https://parklands.intrac.com.au/sports/schedule.cfm?location=55",
                "Centennial Park, Grand Dr, Centennial Park NSW 2021", "2021", "(02) 9662 7033", 11, "Hard Court"),
                "Centennial Parklands"),
            located(venue("moorePark", "Moore Park Courts", BookingFamily::ColorThresholdGrid,
                "https://parklands.intrac.com.au/sports/schedule.cfm?location=72",
                "Moore Park, Anzac Parade, Moore Park NSW 2021", "2021", "(02) 9662 7033", 4, "Hard Court"),
                "Moore Park Courts"),
            venue("sydneyBoysHigh", "Sydney Boys High School", BookingFamily::ColorTableA,
                "https://www.tennisvenues.com.au/booking/sydney-boys-high-school",
                "556 Cleveland St, Moore Park NSW 2021", "2021", "0416 007 810", 6, "Hard Court"),
        ];

        Self { venues }
    }
}

#[allow(clippy::too_many_arguments)]
fn venue(
    key: &str,
    name: &str,
    family: BookingFamily,
    url: &str,
    address: &str,
    postcode: &str,
    phone: &str,
    courts: u32,
    surface: &str,
) -> (String, Venue) {
    (
        key.to_string(),
        Venue {
            name: name.to_string(),
            family,
            url: url.to_string(),
            address: address.to_string(),
            postcode: postcode.to_string(),
            phone: phone.to_string(),
            courts,
            surface: surface.to_string(),
            location: None,
        },
    )
}

fn located(mut entry: (String, Venue), location: &str) -> (String, Venue) {
    entry.1.location = Some(location.to_string());
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_shape() {
        let catalog = VenueCatalog::builtin();
        assert_eq!(catalog.len(), 14);
        assert_eq!(catalog.keys().next(), Some("coogeeBeach"));
        let centennial = catalog.get("centennialParklands").unwrap();
        assert_eq!(centennial.family, BookingFamily::ColorThresholdGrid);
        assert_eq!(centennial.courts, 11);
        assert_eq!(centennial.location.as_deref(), Some("Centennial Parklands"));
    }

    #[test]
    fn test_builtin_jensens_keys() {
        let catalog = VenueCatalog::builtin();
        let jensens: Vec<(&str, &str)> = catalog
            .iter()
            .filter(|(key, _)| key.starts_with("jensens"))
            .map(|(key, venue)| (key, venue.name.as_str()))
            .collect();
        assert_eq!(
            jensens,
            vec![
                ("jensensPaddington", "Prince Alfred Park"),
                ("jensensCentennial", "Alexandria"),
                ("jensensCoogee", "Beaconsfield"),
                ("jensensRandwick", "Glebe"),
                ("jensensClovelly", "Rosebery"),
            ]
        );
    }

    #[test]
    fn test_builtin_keys_unique() {
        let catalog = VenueCatalog::builtin();
        assert!(VenueCatalog::new(catalog.venues.clone()).is_ok());
    }

    #[test]
    fn test_yaml_catalog() {
        let yaml = r#"
venues:
  - key: trumper
    name: Trumper Park
    type: trumper-park
    url: https://wentworthtennis.intrac.com.au/tennis/book.cfm
    address: Quarry St, Paddington NSW 2021
    postcode: "2021"
    phone: (02) 9363 4955
    courts: 8
    surface: Hard Court
  - key: parklands
    name: Parklands
    type: parklands-sports
    url: https://parklands.intrac.com.au/sports/schedule.cfm
    address: Grand Dr
    postcode: "2021"
    phone: "-"
    courts: 4
    surface: Hard Court
    location: Moore Park Courts
"#;
        let catalog = VenueCatalog::from_yaml(yaml).unwrap();
        assert_eq!(catalog.keys().collect::<Vec<_>>(), vec!["trumper", "parklands"]);
        assert_eq!(catalog.get("trumper").unwrap().family, BookingFamily::TrumperPark);
        assert_eq!(
            catalog.get("parklands").unwrap().location.as_deref(),
            Some("Moore Park Courts")
        );
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let yaml = "venues:\n  - {key: a, name: A, type: intrac, url: u, address: x, postcode: '1', phone: p, courts: 1, surface: s}\n  - {key: a, name: B, type: intrac, url: u, address: x, postcode: '1', phone: p, courts: 1, surface: s}\n";
        assert!(VenueCatalog::from_yaml(yaml).is_err());
    }
}
