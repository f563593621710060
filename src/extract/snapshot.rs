//! Rendered page state
//!
//! A serializable picture of the booking page taken after navigation: every
//! table with its rows and cells (text, background, link state) plus any
//! loose slot elements outside tables. Captured in the browser by
//! [`CAPTURE_SCRIPT`]; [`PageSnapshot::from_html`] builds the same structure
//! from static markup when the script cannot run.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::normalize::origin_of;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSnapshot {
    pub url: String,
    pub origin: String,
    pub tables: Vec<TableSnapshot>,
    pub loose: Vec<CellSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableSnapshot {
    /// Index into `rows` of the header row (`thead tr` or the first row).
    pub header_index: Option<usize>,
    /// Text of the first `th` in the table.
    pub first_th: Option<String>,
    /// Text of the enclosing section/location/venue container.
    pub section_text: Option<String>,
    pub rows: Vec<RowSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowSnapshot {
    pub text: String,
    pub cells: Vec<CellSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellSnapshot {
    /// Upper-case tag name.
    pub tag: String,
    pub text: String,
    /// Computed background colour as reported by the browser.
    pub background: String,
    /// Legacy `bgcolor` attribute.
    pub bgcolor: Option<String>,
    pub has_link: bool,
    pub has_onclick: bool,
    pub href: Option<String>,
    // Loose elements only.
    pub parent_text: Option<String>,
    pub court_context: Option<String>,
    pub section_text: Option<String>,
}

impl CellSnapshot {
    pub fn is_data_cell(&self) -> bool {
        self.tag.eq_ignore_ascii_case("td")
    }

    /// Contains a link, has a click handler, or is itself a link/button.
    pub fn is_clickable(&self) -> bool {
        self.has_link
            || self.has_onclick
            || self.tag.eq_ignore_ascii_case("a")
            || self.tag.eq_ignore_ascii_case("button")
    }
}

impl TableSnapshot {
    pub fn header_row(&self) -> Option<&RowSnapshot> {
        self.header_index.and_then(|i| self.rows.get(i))
    }

    pub fn header_text(&self, column: usize) -> Option<&str> {
        self.header_row()
            .and_then(|row| row.cells.get(column))
            .map(|cell| cell.text.as_str())
    }

    pub fn body_rows(&self) -> impl Iterator<Item = &RowSnapshot> {
        let header = self.header_index;
        self.rows
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != header)
            .map(|(_, row)| row)
    }
}

/// In-page capture. `arguments[0]` is the loose-element selector or null.
pub const CAPTURE_SCRIPT: &str = r#"
const looseSelector = arguments[0];
const clip = (s, n) => (s || '').trim().slice(0, n);
const background = el => {
  const style = window.getComputedStyle(el);
  return style ? (style.backgroundColor || '') : '';
};
const describe = (el, withContext) => {
  const link = el.querySelector('a');
  const out = {
    tag: el.tagName,
    text: clip(el.textContent, 2000),
    background: background(el),
    bgcolor: el.getAttribute('bgcolor'),
    hasLink: link !== null,
    hasOnclick: el.onclick !== null || el.hasAttribute('onclick'),
    href: link ? link.getAttribute('href') : (el.tagName === 'A' ? el.getAttribute('href') : null)
  };
  if (withContext) {
    const court = el.closest('[class*="court"]');
    const section = el.closest('section, div[class*="location"], div[class*="venue"]');
    out.parentText = el.parentElement ? clip(el.parentElement.textContent, 2000) : null;
    out.courtContext = court ? clip(court.textContent, 500) : null;
    out.sectionText = section ? clip(section.textContent, 4000) : null;
  }
  return out;
};
const tables = Array.from(document.querySelectorAll('table')).map(table => {
  const rows = Array.from(table.querySelectorAll('tr'));
  const header = table.querySelector('thead tr, tr:first-child');
  const th = table.querySelector('th');
  const section = table.closest('section, div[class*="location"], div[class*="venue"]');
  const headerIndex = header ? rows.indexOf(header) : -1;
  return {
    headerIndex: headerIndex >= 0 ? headerIndex : null,
    firstTh: th ? clip(th.textContent, 200) : null,
    sectionText: section ? clip(section.textContent, 4000) : null,
    rows: rows.map(row => ({
      text: clip(row.textContent, 2000),
      cells: Array.from(row.cells).map(c => describe(c, false))
    }))
  };
});
const loose = looseSelector
  ? Array.from(document.querySelectorAll(looseSelector)).map(el => describe(el, true))
  : [];
return { url: window.location.href, origin: window.location.origin, tables, loose };
"#;

static INLINE_BACKGROUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)background(?:-color)?\s*:\s*([^;]+)").expect("valid background regex")
});

impl PageSnapshot {
    /// Build a snapshot from static HTML. Backgrounds come from inline
    /// `style` declarations, then `bgcolor`, since no computed style is
    /// available.
    pub fn from_html(html: &str, url: &str, loose_selector: Option<&str>) -> Self {
        let document = Html::parse_document(html);

        let selectors = (
            Selector::parse("table"),
            Selector::parse("tr"),
            Selector::parse("th"),
        );
        let tables = match selectors {
            (Ok(table_sel), Ok(row_sel), Ok(th_sel)) => document
                .select(&table_sel)
                .map(|table| table_from_html(table, &row_sel, &th_sel))
                .collect(),
            _ => vec![],
        };

        let loose = loose_selector
            .and_then(|s| Selector::parse(s).ok())
            .map(|selector| {
                document
                    .select(&selector)
                    .map(|el| {
                        let mut cell = cell_from_html(el);
                        cell.parent_text = el
                            .parent()
                            .and_then(ElementRef::wrap)
                            .map(|p| element_text(&p));
                        cell.court_context = closest(el, |e| class_contains(e, "court"))
                            .map(|c| element_text(&c));
                        cell.section_text = closest(el, is_section).map(|s| element_text(&s));
                        cell
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            url: url.to_string(),
            origin: origin_of(url),
            tables,
            loose,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.loose.is_empty()
    }
}

fn table_from_html(table: ElementRef, row_sel: &Selector, th_sel: &Selector) -> TableSnapshot {
    let rows: Vec<ElementRef> = table.select(row_sel).collect();

    let header_index = rows
        .iter()
        .position(|row| {
            row.parent()
                .and_then(ElementRef::wrap)
                .map(|p| p.value().name() == "thead")
                .unwrap_or(false)
        })
        .or(if rows.is_empty() { None } else { Some(0) });

    TableSnapshot {
        header_index,
        first_th: table.select(th_sel).next().map(|th| element_text(&th)),
        section_text: closest(table, is_section).map(|s| element_text(&s)),
        rows: rows
            .iter()
            .map(|row| RowSnapshot {
                text: element_text(row),
                cells: row
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| matches!(c.value().name(), "td" | "th"))
                    .map(cell_from_html)
                    .collect(),
            })
            .collect(),
    }
}

fn cell_from_html(el: ElementRef) -> CellSnapshot {
    let value = el.value();
    let link = Selector::parse("a")
        .ok()
        .and_then(|sel| el.select(&sel).next());

    let background = value
        .attr("style")
        .and_then(|style| INLINE_BACKGROUND.captures(style))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .or_else(|| value.attr("bgcolor").map(|c| c.trim().to_string()))
        .unwrap_or_default();

    let href = match link {
        Some(a) => a.value().attr("href").map(str::to_string),
        None if value.name() == "a" => value.attr("href").map(str::to_string),
        None => None,
    };

    CellSnapshot {
        tag: value.name().to_ascii_uppercase(),
        text: element_text(&el),
        background,
        bgcolor: value.attr("bgcolor").map(str::to_string),
        has_link: link.is_some(),
        has_onclick: value.attr("onclick").is_some(),
        href,
        parent_text: None,
        court_context: None,
        section_text: None,
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// The element itself or its nearest ancestor matching `pred`.
fn closest<'a>(
    el: ElementRef<'a>,
    pred: impl Fn(&ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    if pred(&el) {
        return Some(el);
    }
    el.ancestors().filter_map(ElementRef::wrap).find(|a| pred(a))
}

fn class_contains(el: &ElementRef, needle: &str) -> bool {
    el.value()
        .attr("class")
        .map(|c| c.contains(needle))
        .unwrap_or(false)
}

fn is_section(el: &ElementRef) -> bool {
    match el.value().name() {
        "section" => true,
        "div" => class_contains(el, "location") || class_contains(el, "venue"),
        _ => false,
    }
}
