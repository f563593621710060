//! Slot extraction
//!
//! Each booking family paints availability differently. Extraction works in
//! two steps: the page is captured once into a [`PageSnapshot`], then the
//! family's heuristic walks the snapshot. Extraction never fails; a page
//! that cannot be read yields no slots.

pub mod color;
pub mod court;
pub mod snapshot;
pub mod time;

mod attribute_table;
mod color_table;
mod threshold_grid;
mod white_cells;

pub use snapshot::{CellSnapshot, PageSnapshot, RowSnapshot, TableSnapshot, CAPTURE_SCRIPT};

use tracing::{debug, warn};

use crate::session::BrowserPage;
use crate::types::{BookingFamily, Slot, Venue};

/// Grid cells with more text than this are notes, not slot labels.
pub const MAX_CELL_TEXT: usize = 30;

/// Selector for slot elements that live outside tables, if the family
/// uses any.
pub fn loose_selector(family: BookingFamily) -> Option<&'static str> {
    match family {
        BookingFamily::ColorTableA => Some(color_table::LOOSE_SELECTOR),
        BookingFamily::TrumperPark => Some(white_cells::TRUMPER_SELECTOR),
        BookingFamily::ParklandsSports => Some(white_cells::PARKLANDS_SELECTOR),
        BookingFamily::ColorTableB | BookingFamily::ColorThresholdGrid => None,
    }
}

/// Run the venue's family heuristic over a captured page.
pub fn extract_slots(venue: &Venue, snapshot: &PageSnapshot) -> Vec<Slot> {
    match venue.family {
        BookingFamily::ColorTableA => color_table::extract(snapshot),
        BookingFamily::ColorTableB => attribute_table::extract(snapshot),
        BookingFamily::ColorThresholdGrid => threshold_grid::extract(snapshot, venue.courts),
        BookingFamily::TrumperPark => white_cells::extract_trumper(snapshot),
        BookingFamily::ParklandsSports => {
            white_cells::extract_parklands(snapshot, venue.location.as_deref())
        }
    }
}

/// Capture the rendered page, falling back to parsing the page source and
/// finally to an empty snapshot.
pub async fn capture_page(page: &dyn BrowserPage, family: BookingFamily) -> PageSnapshot {
    let loose = loose_selector(family);
    match page.capture(loose).await {
        Ok(snapshot) => return snapshot,
        Err(e) => warn!("In-page capture failed, parsing page source instead: {:#}", e),
    }

    let url = page.current_url().await.unwrap_or_default();
    match page.source().await {
        Ok(html) => PageSnapshot::from_html(&html, &url, loose),
        Err(e) => {
            warn!("Could not read page source: {:#}", e);
            PageSnapshot {
                url: url.clone(),
                origin: crate::normalize::origin_of(&url),
                ..Default::default()
            }
        }
    }
}

/// Capture the page and extract the venue's free slots.
pub async fn extract_availability(page: &dyn BrowserPage, venue: &Venue) -> Vec<Slot> {
    let snapshot = capture_page(page, venue.family).await;
    let slots = extract_slots(venue, &snapshot);
    debug!(
        "{}: {} tables, {} loose elements, {} raw slots",
        venue.name,
        snapshot.tables.len(),
        snapshot.loose.len(),
        slots.len()
    );
    slots
}
