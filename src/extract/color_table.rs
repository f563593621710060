//! TennisVenues booking tables.
//!
//! Free slots are white (or unpainted) cells carrying a link or click
//! handler. Courts come from the header cell above the slot's column.
//! Some venues render slots as loose `div`s instead; those take the court
//! from `Court N` text in the element or its court container.

use super::color::is_blank_background;
use super::court::{clean_header_label, court_in_text};
use super::snapshot::PageSnapshot;
use super::time::parse_time;
use crate::normalize::resolve_booking_url;
use crate::types::Slot;

pub const LOOSE_SELECTOR: &str = r#"div[class*="timeslot"], div[class*="court"], div[data-time]"#;

pub fn extract(snapshot: &PageSnapshot) -> Vec<Slot> {
    let mut slots = Vec::new();

    for table in &snapshot.tables {
        for row in table.body_rows() {
            for (column, cell) in row.cells.iter().enumerate().skip(1) {
                if cell.text.is_empty()
                    || !(cell.has_link || cell.has_onclick)
                    || !is_blank_background(&cell.background)
                {
                    continue;
                }
                let Some(time) = parse_time(&cell.text) else {
                    continue;
                };

                let header = table
                    .header_text(column)
                    .filter(|h| !h.trim().is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Court {}", column));
                let Some(court) = clean_header_label(&header) else {
                    continue;
                };

                let booking_url = resolve_booking_url(cell.href.as_deref(), &snapshot.origin);
                slots.push(Slot::new(time.time, time.display, court).with_booking_url(booking_url));
            }
        }
    }

    for cell in &snapshot.loose {
        if cell.text.is_empty()
            || !(cell.has_link || cell.has_onclick)
            || !is_blank_background(&cell.background)
        {
            continue;
        }
        let Some(time) = parse_time(&cell.text) else {
            continue;
        };

        let court = cell
            .court_context
            .as_deref()
            .and_then(court_in_text)
            .or_else(|| court_in_text(&cell.text))
            .unwrap_or_else(|| "Court 1".to_string());
        if court == "Court 0" {
            continue;
        }

        slots.push(
            Slot::new(time.time, time.display, court)
                .with_booking_url(resolve_booking_url(cell.href.as_deref(), &snapshot.origin)),
        );
    }

    // Slots without their own link point at the page they were found on.
    if !snapshot.url.is_empty() {
        for slot in slots.iter_mut().filter(|s| s.booking_url.is_none()) {
            slot.booking_url = Some(snapshot.url.clone());
        }
    }

    slots
}
