//! Pages that mark free slots with a plain white, clickable cell, both in
//! tables and as loose slot elements.

use super::color::is_white_background;
use super::court::court_in_text;
use super::snapshot::{CellSnapshot, PageSnapshot};
use super::time::parse_time;
use crate::normalize::resolve_booking_url;
use crate::types::Slot;

pub const TRUMPER_SELECTOR: &str = r#"div[class*="slot"], div[data-time]"#;
pub const PARKLANDS_SELECTOR: &str = r#"div[class*="slot"], div[class*="booking"], div[data-time]"#;

/// Locations that share one Parklands booking page.
const PARKLANDS_LOCATIONS: &[&str] = &["Centennial Parklands", "Moore Park"];

const UNKNOWN_COURT: &str = "Court Unknown";

struct Candidate<'a> {
    cell: &'a CellSnapshot,
    parent_text: Option<&'a str>,
    section_text: Option<&'a str>,
    first_th: Option<&'a str>,
}

fn candidates(snapshot: &PageSnapshot) -> Vec<Candidate<'_>> {
    let mut out = Vec::new();
    for table in &snapshot.tables {
        for row in &table.rows {
            for cell in row.cells.iter().filter(|c| c.is_data_cell()) {
                out.push(Candidate {
                    cell,
                    parent_text: Some(row.text.as_str()),
                    section_text: table.section_text.as_deref(),
                    first_th: table.first_th.as_deref(),
                });
            }
        }
    }
    for cell in &snapshot.loose {
        out.push(Candidate {
            cell,
            parent_text: cell.parent_text.as_deref(),
            section_text: cell.section_text.as_deref(),
            first_th: None,
        });
    }
    out
}

fn free_slot(candidate: &Candidate, snapshot: &PageSnapshot, court: String) -> Option<Slot> {
    let cell = candidate.cell;
    if cell.text.is_empty() || !cell.is_clickable() || !is_white_background(&cell.background) {
        return None;
    }
    let time = parse_time(&cell.text)?;
    Some(
        Slot::new(time.time, time.display, court)
            .with_booking_url(resolve_booking_url(cell.href.as_deref(), &snapshot.origin)),
    )
}

/// Trumper Park: court from the cell text, else the table's first header.
pub fn extract_trumper(snapshot: &PageSnapshot) -> Vec<Slot> {
    candidates(snapshot)
        .iter()
        .filter_map(|c| {
            let court = court_in_text(&c.cell.text)
                .or_else(|| c.first_th.and_then(court_in_text))
                .unwrap_or_else(|| UNKNOWN_COURT.to_string());
            free_slot(c, snapshot, court)
        })
        .collect()
}

/// Parklands Sports: cells attributed to a different Parklands location
/// than `location` are dropped. Cells that name no location are kept.
pub fn extract_parklands(snapshot: &PageSnapshot, location: Option<&str>) -> Vec<Slot> {
    candidates(snapshot)
        .iter()
        .filter(|c| belongs_to(c, location))
        .filter_map(|c| {
            let court = court_in_text(&c.cell.text).unwrap_or_else(|| UNKNOWN_COURT.to_string());
            free_slot(c, snapshot, court)
        })
        .collect()
}

fn belongs_to(candidate: &Candidate, location: Option<&str>) -> bool {
    let Some(target) = location else {
        return true;
    };
    let texts = [
        Some(candidate.cell.text.as_str()),
        candidate.parent_text,
        candidate.section_text,
    ];
    let mentioned = texts.iter().flatten().find_map(|text| {
        PARKLANDS_LOCATIONS
            .iter()
            .find(|loc| text.contains(*loc))
    });
    match mentioned {
        Some(loc) => target.contains(loc),
        None => true,
    }
}
