//! Intrac court booking tables: a linked cell is free when either its
//! `bgcolor` attribute or its computed background is blank.

use super::color::{is_blank_attribute, is_blank_background};
use super::court::header_court_label;
use super::snapshot::PageSnapshot;
use super::time::parse_time;
use crate::normalize::resolve_booking_url;
use crate::types::Slot;

pub fn extract(snapshot: &PageSnapshot) -> Vec<Slot> {
    let mut slots = Vec::new();

    for table in &snapshot.tables {
        for row in &table.rows {
            for (column, cell) in row.cells.iter().enumerate() {
                if column == 0 || !cell.is_data_cell() || !cell.has_link || cell.text.is_empty() {
                    continue;
                }
                let available = is_blank_attribute(cell.bgcolor.as_deref())
                    || is_blank_background(&cell.background);
                if !available {
                    continue;
                }
                let Some(time) = parse_time(&cell.text) else {
                    continue;
                };

                let court = table
                    .header_text(column)
                    .and_then(header_court_label)
                    .unwrap_or_else(|| format!("Court {}", column));

                let booking_url = resolve_booking_url(cell.href.as_deref(), &snapshot.origin);
                slots.push(Slot::new(time.time, time.display, court).with_booking_url(booking_url));
            }
        }
    }

    slots
}
