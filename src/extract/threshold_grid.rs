//! Sports-centre schedule grids: one row per time, one column per court.
//! Booked cells are painted orange; anything else in the venue's court
//! columns is free.

use super::color::is_warning_background;
use super::snapshot::PageSnapshot;
use super::time::parse_time;
use super::MAX_CELL_TEXT;
use crate::types::Slot;

pub fn extract(snapshot: &PageSnapshot, courts: u32) -> Vec<Slot> {
    let mut slots = Vec::new();

    for table in &snapshot.tables {
        for row in &table.rows {
            let cells: Vec<_> = row.cells.iter().filter(|c| c.is_data_cell()).collect();
            let Some(time) = cells.first().and_then(|c| parse_time(&c.text)) else {
                continue;
            };

            for court in 1..=courts as usize {
                let Some(cell) = cells.get(court) else {
                    break;
                };
                if cell.text.chars().count() > MAX_CELL_TEXT
                    || is_warning_background(&cell.background)
                {
                    continue;
                }
                slots.push(Slot::new(
                    time.time.clone(),
                    time.display.clone(),
                    format!("Court {}", court),
                ));
            }
        }
    }

    slots
}
