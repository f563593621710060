//! URL helpers and slot normalization
//!
//! - Resolve booking links against the page origin
//! - Encode the target date into URL-addressable booking pages
//! - Normalize raw slots: future-only filtering, dedup on (time, court),
//!   chronological ordering

use crate::extract::time::minutes_of_day;
use crate::types::Slot;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use reqwest::Url;
use std::collections::HashMap;

/// `scheme://host[:port]` of `url`, or an empty string when it has none.
pub fn origin_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
            parsed.origin().ascii_serialization()
        }
        _ => String::new(),
    }
}

/// Absolute booking link for an `href` found in a cell. Fragment-only and
/// `javascript:` links are not bookable addresses.
pub fn resolve_booking_url(href: Option<&str>, origin: &str) -> Option<String> {
    let href = href?.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.to_ascii_lowercase().starts_with("javascript:")
    {
        return None;
    }
    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute.to_string());
    }
    let base = Url::parse(origin).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// `url` with its `date` query parameter set to `date` (YYYY-MM-DD).
pub fn with_date_param(url: &str, date: NaiveDate) -> String {
    let value = date.format("%Y-%m-%d").to_string();
    match Url::parse(url) {
        Ok(mut parsed) => {
            let kept: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(k, _)| k != "date")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            parsed
                .query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair("date", &value);
            parsed.to_string()
        }
        Err(_) => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{}{}date={}", url, sep, value)
        }
    }
}

/// Canonical slot list for one venue result.
///
/// When `target` is the date of `now`, slots not strictly later than the
/// current minute are dropped. Duplicate (time, court) pairs keep the
/// position of their first occurrence and the value of their last. The
/// output is stably sorted by time.
pub fn normalize_slots(slots: Vec<Slot>, target: NaiveDate, now: NaiveDateTime) -> Vec<Slot> {
    let cutoff = (target == now.date()).then(|| now.hour() * 60 + now.minute());

    let mut out: Vec<Slot> = Vec::with_capacity(slots.len());
    let mut seen: HashMap<(String, String), usize> = HashMap::new();

    for slot in slots {
        if let Some(cutoff) = cutoff {
            match minutes_of_day(&slot.time) {
                Some(minutes) if minutes > cutoff => {}
                _ => continue,
            }
        }
        let key = (slot.time.clone(), slot.court.clone());
        match seen.get(&key) {
            Some(&index) => out[index] = slot,
            None => {
                seen.insert(key, out.len());
                out.push(slot);
            }
        }
    }

    out.sort_by(|a, b| a.time.cmp(&b.time));
    out
}
