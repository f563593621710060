use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Booking-system family of a venue. Selects the navigation chain and the
/// availability heuristic used for the venue's pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingFamily {
    /// TennisVenues tables: white + clickable cells are free.
    #[serde(rename = "tennisvenues")]
    ColorTableA,
    /// Intrac court booking: `bgcolor` attribute or computed white + link.
    #[serde(rename = "intrac")]
    ColorTableB,
    /// Intrac sports schedule grid: orange cells are booked.
    #[serde(rename = "intrac-sports")]
    ColorThresholdGrid,
    /// Wentworth Tennis at Trumper Park.
    #[serde(rename = "trumper-park")]
    TrumperPark,
    /// Parklands Sports schedule shared between several locations.
    #[serde(rename = "parklands-sports")]
    ParklandsSports,
}

impl BookingFamily {
    pub const ALL: [BookingFamily; 5] = [
        BookingFamily::ColorTableA,
        BookingFamily::ColorTableB,
        BookingFamily::ColorThresholdGrid,
        BookingFamily::TrumperPark,
        BookingFamily::ParklandsSports,
    ];

    /// Tag written to the `type` field of result records.
    pub fn tag(&self) -> &'static str {
        match self {
            BookingFamily::ColorTableA => "tennisvenues",
            BookingFamily::ColorTableB => "intrac",
            BookingFamily::ColorThresholdGrid => "intrac-sports",
            BookingFamily::TrumperPark => "trumper-park",
            BookingFamily::ParklandsSports => "parklands-sports",
        }
    }

    /// Scrape ordering priority, lowest first. TennisVenues pages navigate
    /// fastest and yield direct booking links, so they go out first.
    pub fn priority(&self) -> u8 {
        match self {
            BookingFamily::ColorTableA => 0,
            BookingFamily::ColorTableB => 1,
            BookingFamily::ColorThresholdGrid => 2,
            BookingFamily::TrumperPark => 3,
            BookingFamily::ParklandsSports => 4,
        }
    }

    /// Whether the booking backend accepts a `date=YYYY-MM-DD` parameter.
    pub fn url_addressable(&self) -> bool {
        matches!(
            self,
            BookingFamily::ColorTableB | BookingFamily::ColorThresholdGrid
        )
    }
}

impl fmt::Display for BookingFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for BookingFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingFamily::ALL
            .into_iter()
            .find(|family| family.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown booking family: {}", s))
    }
}

/// Static catalog entry for one venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    #[serde(rename = "type")]
    pub family: BookingFamily,
    pub url: String,
    pub address: String,
    pub postcode: String,
    pub phone: String,
    pub courts: u32,
    pub surface: String,
    /// Location label used by schedules that list several sites on one page.
    #[serde(default)]
    pub location: Option<String>,
}

/// One bookable (time, court) unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Zero-padded 24-hour `HH:MM`.
    pub time: String,
    /// Time text as it appeared on the page.
    pub time_display: String,
    pub court: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_url: Option<String>,
}

impl Slot {
    pub fn new(
        time: impl Into<String>,
        time_display: impl Into<String>,
        court: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            time_display: time_display.into(),
            court: court.into(),
            booking_url: None,
        }
    }

    pub fn with_booking_url(mut self, url: Option<String>) -> Self {
        self.booking_url = url;
        self
    }

    /// Uniqueness key within one venue's result.
    pub fn key(&self) -> (&str, &str) {
        (&self.time, &self.court)
    }
}

/// How the page got to the requested date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationStatus {
    /// The requested date is today or earlier; the landing page was used.
    NotNeeded,
    /// The date was encoded in the page address.
    DirectUrl,
    /// A click-based strategy reported success.
    Confirmed,
    /// Every strategy failed; slots come from whatever date was displayed.
    Uncertain,
}

/// Outcome of scraping one venue for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueResult {
    pub venue_key: String,
    pub club: String,
    pub address: String,
    pub postcode: String,
    pub region: String,
    pub phone: String,
    pub website: String,
    #[serde(rename = "type")]
    pub family: BookingFamily,
    pub date: NaiveDate,
    pub total_courts: u32,
    pub surface: String,
    pub available_slots: Vec<Slot>,
    pub scraped_at: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<NavigationStatus>,
}

impl VenueResult {
    fn base(venue_key: &str, venue: &Venue, region: &str, date: NaiveDate) -> Self {
        Self {
            venue_key: venue_key.to_string(),
            club: venue.name.clone(),
            address: venue.address.clone(),
            postcode: venue.postcode.clone(),
            region: region.to_string(),
            phone: venue.phone.clone(),
            website: venue.url.clone(),
            family: venue.family,
            date,
            total_courts: venue.courts,
            surface: venue.surface.clone(),
            available_slots: vec![],
            scraped_at: Utc::now().to_rfc3339(),
            success: false,
            error: None,
            navigation: None,
        }
    }

    pub fn success(
        venue_key: &str,
        venue: &Venue,
        region: &str,
        date: NaiveDate,
        slots: Vec<Slot>,
        navigation: NavigationStatus,
    ) -> Self {
        Self {
            available_slots: slots,
            success: true,
            navigation: Some(navigation),
            ..Self::base(venue_key, venue, region, date)
        }
    }

    pub fn failure(
        venue_key: &str,
        venue: &Venue,
        region: &str,
        date: NaiveDate,
        error: impl Into<String>,
    ) -> Self {
        let mut message = error.into();
        if message.trim().is_empty() {
            message = "Unknown error".to_string();
        }
        Self {
            error: Some(message),
            ..Self::base(venue_key, venue, region, date)
        }
    }
}

/// Aggregated results of one scrape run, one record per selected venue.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub date: NaiveDate,
    /// `None` when every region was requested.
    pub region: Option<String>,
    pub results: Vec<VenueResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub total_venues: usize,
    pub successful: usize,
    pub total_slots: usize,
}

impl Snapshot {
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            total_venues: self.results.len(),
            successful: self.results.iter().filter(|r| r.success).count(),
            total_slots: self.results.iter().map(|r| r.available_slots.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue() -> Venue {
        Venue {
            name: "Test Courts".to_string(),
            family: BookingFamily::ColorTableB,
            url: "https://example.com/book".to_string(),
            address: "1 Test St".to_string(),
            postcode: "2000".to_string(),
            phone: "000".to_string(),
            courts: 4,
            surface: "Hard Court".to_string(),
            location: None,
        }
    }

    #[test]
    fn test_family_tags_round_trip_through_from_str() {
        for family in BookingFamily::ALL {
            assert_eq!(family.tag().parse::<BookingFamily>(), Ok(family));
        }
        assert!("squash".parse::<BookingFamily>().is_err());
    }

    #[test]
    fn test_family_serializes_as_tag() {
        let json = serde_json::to_string(&BookingFamily::ColorThresholdGrid).unwrap();
        assert_eq!(json, "\"intrac-sports\"");
    }

    #[test]
    fn test_result_record_field_names() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 30).unwrap();
        let slot = Slot::new("18:00", "6:00pm", "Court 1")
            .with_booking_url(Some("https://example.com/b/1".to_string()));
        let result = VenueResult::success(
            "test",
            &venue(),
            "Inner City",
            date,
            vec![slot],
            NavigationStatus::DirectUrl,
        );
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["club"], "Test Courts");
        assert_eq!(value["type"], "intrac");
        assert_eq!(value["date"], "2025-10-30");
        assert_eq!(value["totalCourts"], 4);
        assert_eq!(value["navigation"], "directUrl");
        assert_eq!(value["availableSlots"][0]["timeDisplay"], "6:00pm");
        assert_eq!(value["availableSlots"][0]["bookingUrl"], "https://example.com/b/1");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_failure_has_message_and_no_slots() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 30).unwrap();
        let result = VenueResult::failure("test", &venue(), "Unknown", date, "");
        assert!(!result.success);
        assert!(result.available_slots.is_empty());
        assert_eq!(result.error.as_deref(), Some("Unknown error"));
    }

    #[test]
    fn test_slot_without_link_omits_booking_url() {
        let value = serde_json::to_value(Slot::new("07:00", "7:00am", "Court 2")).unwrap();
        assert!(value.get("bookingUrl").is_none());
    }
}
