use once_cell::sync::Lazy;
use regex::Regex;

static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*(am|pm)?").expect("valid time regex")
});

/// A time found in cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTime {
    /// Zero-padded 24-hour `HH:MM`.
    pub time: String,
    /// The matched text, e.g. `6:30 pm`.
    pub display: String,
}

/// Find the first `H:MM` time in `text`, with optional am/pm, and convert it
/// to 24-hour form. 12am is midnight, 12pm is noon.
pub fn parse_time(text: &str) -> Option<SlotTime> {
    let caps = TIME_PATTERN.captures(text)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;

    match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
        Some("pm") if hour != 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }

    if hour > 23 || minute > 59 {
        return None;
    }

    Some(SlotTime {
        time: format!("{:02}:{:02}", hour, minute),
        display: caps.get(0)?.as_str().to_string(),
    })
}

/// Minutes since midnight for an `HH:MM` string.
pub fn minutes_of_day(time: &str) -> Option<u32> {
    let (h, m) = time.split_once(':')?;
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.trim().parse().ok()?;
    (h < 24 && m < 60).then_some(h * 60 + m)
}
