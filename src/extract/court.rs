use once_cell::sync::Lazy;
use regex::Regex;

/// Labels longer than this are page text caught by accident, not headers.
pub const MAX_LABEL_LEN: usize = 50;

static SURFACE_SUFFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\s+(syn|synthetic)\s+(grass|clay|court)",
        r"(?i)\s+hard\s+court",
        r"(?i)\s+grass\s+court",
        r"(?i)\s+clay\s+court",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid surface regex"))
    .collect()
});

static COURT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Court\s*(\d+)").expect("valid court regex"));

static TIME_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}:\d{2}").expect("valid time prefix regex"));

const STYLE_ARTIFACTS: &[&str] = &["{", "}", "table.", "width:", "border-", "padding:"];

/// Turn a table header into a court label: strip surface qualifiers, reject
/// stylesheet debris and over-long text, and prefix bare numbers/letters
/// with "Court".
pub fn clean_header_label(header: &str) -> Option<String> {
    let mut label = header.trim().to_string();
    for re in SURFACE_SUFFIXES.iter() {
        label = re.replace_all(&label, "").into_owned();
    }
    let label = label.trim();

    if label.is_empty() || label.chars().count() > MAX_LABEL_LEN || has_style_artifacts(label) {
        return None;
    }

    let label = if label.to_lowercase().contains("court") {
        label.to_string()
    } else {
        format!("Court {}", label)
    };

    (label != "Court 0").then_some(label)
}

/// Header text that can label a court: not empty, not a time.
pub fn header_court_label(header: &str) -> Option<String> {
    let header = header.trim();
    if header.is_empty() || TIME_PREFIX.is_match(header) {
        return None;
    }
    if header.to_lowercase().contains("court") {
        Some(header.to_string())
    } else {
        Some(format!("Court {}", header))
    }
}

/// `Court N` found anywhere in `text`.
pub fn court_in_text(text: &str) -> Option<String> {
    COURT_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| format!("Court {}", m.as_str()))
}

fn has_style_artifacts(label: &str) -> bool {
    STYLE_ARTIFACTS.iter().any(|a| label.contains(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_suffixes_stripped() {
        assert_eq!(clean_header_label("Court 2 syn grass").as_deref(), Some("Court 2"));
        assert_eq!(clean_header_label("Court 7 hard court").as_deref(), Some("Court 7"));
        assert_eq!(clean_header_label("Court 3 Synthetic Clay").as_deref(), Some("Court 3"));
        assert_eq!(clean_header_label("Court 1 grass court").as_deref(), Some("Court 1"));
    }

    #[test]
    fn test_bare_labels_prefixed() {
        assert_eq!(clean_header_label("4").as_deref(), Some("Court 4"));
        assert_eq!(clean_header_label("B").as_deref(), Some("Court B"));
        assert_eq!(clean_header_label("0"), None);
    }

    #[test]
    fn test_debris_rejected() {
        assert_eq!(clean_header_label("table.booking { width: 100% }"), None);
        assert_eq!(clean_header_label(&"x".repeat(51)), None);
        assert_eq!(clean_header_label("   "), None);
    }

    #[test]
    fn test_header_court_label_skips_times() {
        assert_eq!(header_court_label("7:00am"), None);
        assert_eq!(header_court_label("3").as_deref(), Some("Court 3"));
        assert_eq!(header_court_label("Court 5").as_deref(), Some("Court 5"));
    }

    #[test]
    fn test_court_in_text() {
        assert_eq!(court_in_text("6:00pm court12").as_deref(), Some("Court 12"));
        assert_eq!(court_in_text("6:00pm"), None);
    }
}
