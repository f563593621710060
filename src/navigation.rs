//! Date navigation
//!
//! Moves a venue's booking page to the requested date. URL-addressable
//! backends take the date as a query parameter; everything else is driven
//! by clicking, trying each strategy of the family's chain in order until
//! one reports success.

use crate::normalize::with_date_param;
use crate::pacing::Pacer;
use crate::session::{BrowserPage, ClickMode, ClickTarget, ElementInfo};
use crate::types::{BookingFamily, NavigationStatus, Venue};
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

/// Month-control clicks allowed while aligning a calendar.
pub const MAX_MONTH_STEPS: i32 = 3;

const MONTH_TITLE: &str =
    r#".ui-datepicker-title, .datepicker-title, [class*="calendar"] h2, [class*="month-year"]"#;
const NEXT_MONTH: &str = r#".ui-datepicker-next, [class*="next"], [class*="calendar"] button:last-child, button[aria-label*="next" i]"#;
const PREV_MONTH: &str = r#".ui-datepicker-prev, [class*="prev"], [class*="calendar"] button:first-child, button[aria-label*="prev" i]"#;

const DATE_LINKS: &str = r#"a[href*="date="], a[href*="day="], .calendar a, .datepicker a"#;
const CALENDAR_CELLS: &str = r#"table.ui-datepicker-calendar td, .calendar table td, [class*="calendar"] table td, [class*="datepicker"] td, table td[data-handler="selectDay"], .ui-datepicker td"#;
const DAY_CELLS: &str = r#"td:not([class*="other-month"]):not(.disabled), button[class*="day"]:not([disabled]), div[role="gridcell"], .calendar-day:not(.disabled), [data-date]"#;

const NEXT_DAY_TEXT: &str = "a, button, span, div";
const NEXT_DAY_SELECTORS: &[&str] = &[
    r#"a[title*="next" i]"#,
    r#"button[title*="next" i]"#,
    r#"a[aria-label*="next" i]"#,
    r#"button[aria-label*="next" i]"#,
    r#"[data-action*="next" i]"#,
    ".next-day",
    ".nextDay",
    ".fc-next-button",
];
const ARROWS: &str = "a, button";
const ARROW_TEXT: &[&str] = &[">", "›", "→", "-->"];

const DAY_LINKS: &str = "a, button, [onclick]";

const DISABLED_CLASSES: &[&str] = &["disabled", "unavailable", "other-month"];

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

static NEXT_DAY_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)next\s*day\s*[>›]?").expect("valid next-day regex"));

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid year regex"));

/// Calendar days from `today` to `target`.
pub fn days_diff(target: NaiveDate, today: NaiveDate) -> i64 {
    (target - today).num_days()
}

/// The address the session should load first.
pub fn landing_url(venue: &Venue, target: NaiveDate) -> String {
    if venue.family.url_addressable() {
        with_date_param(&venue.url, target)
    } else {
        venue.url.clone()
    }
}

/// Month (1-12) and year shown in a calendar title such as "October 2026".
pub fn parse_month_title(text: &str, default_year: i32) -> Option<(u32, i32)> {
    let lower = text.to_lowercase();
    let month = MONTHS.iter().position(|m| lower.contains(m))? as u32 + 1;
    let year = YEAR
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(default_year);
    Some((month, year))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStrategy {
    /// Align the calendar month, then click the day.
    CalendarClick,
    /// Press "next day" once per day of difference.
    NextDayClicks,
    /// Click a link whose text is the day number.
    LinkDayText,
}

impl NavStrategy {
    pub fn chain(family: BookingFamily) -> &'static [NavStrategy] {
        match family {
            BookingFamily::ColorTableA => &[NavStrategy::CalendarClick, NavStrategy::NextDayClicks],
            BookingFamily::TrumperPark | BookingFamily::ParklandsSports => {
                &[NavStrategy::LinkDayText, NavStrategy::NextDayClicks]
            }
            // Dated through the landing URL.
            BookingFamily::ColorTableB | BookingFamily::ColorThresholdGrid => &[],
        }
    }
}

pub struct Navigator<'a> {
    page: &'a dyn BrowserPage,
    pacer: Pacer,
    post_nav_wait_ms: u64,
}

impl<'a> Navigator<'a> {
    pub fn new(page: &'a dyn BrowserPage, pacer: Pacer, post_nav_wait_ms: u64) -> Self {
        Self {
            page,
            pacer,
            post_nav_wait_ms,
        }
    }

    /// Load the venue's booking page and bring it to `target`.
    ///
    /// Only a failed page load is an error. When every strategy fails the
    /// page is left on whatever date it shows and the status says so.
    pub async fn open_on_date(
        &self,
        venue: &Venue,
        target: NaiveDate,
        today: NaiveDate,
    ) -> Result<NavigationStatus> {
        self.page.goto(&landing_url(venue, target)).await?;
        self.pacer.pause(2000, 3000).await;

        if venue.family.url_addressable() {
            return Ok(NavigationStatus::DirectUrl);
        }

        let days = days_diff(target, today);
        if days <= 0 {
            return Ok(NavigationStatus::NotNeeded);
        }

        for strategy in NavStrategy::chain(venue.family) {
            match self.run(*strategy, target, today, days).await {
                Ok(true) => {
                    info!("{}: moved to {} via {:?}", venue.name, target, strategy);
                    self.settle().await;
                    return Ok(NavigationStatus::Confirmed);
                }
                Ok(false) => debug!("{}: {:?} did not reach {}", venue.name, strategy, target),
                Err(e) => warn!("{}: {:?} failed: {:#}", venue.name, strategy, e),
            }
        }

        warn!(
            "{}: could not navigate to {}, reading the displayed date",
            venue.name, target
        );
        Ok(NavigationStatus::Uncertain)
    }

    async fn run(
        &self,
        strategy: NavStrategy,
        target: NaiveDate,
        today: NaiveDate,
        days: i64,
    ) -> Result<bool> {
        match strategy {
            NavStrategy::CalendarClick => self.calendar_click(target, today).await,
            NavStrategy::NextDayClicks => self.next_day_clicks(days).await,
            NavStrategy::LinkDayText => self.link_day_text(target).await,
        }
    }

    async fn settle(&self) {
        self.pacer
            .pause(self.post_nav_wait_ms, self.post_nav_wait_ms + 1000)
            .await;
    }

    async fn calendar_click(&self, target: NaiveDate, today: NaiveDate) -> Result<bool> {
        self.align_month(target, today).await?;

        let day = target.day().to_string();
        let iso = target.format("%Y-%m-%d").to_string();
        let dmy = target.format("%d/%m/%Y").to_string();

        // Links that carry the full date beat bare day numbers.
        let links = self.page.elements(DATE_LINKS).await?;
        let link = links
            .iter()
            .find(|e| {
                e.visible
                    && e.href
                        .as_deref()
                        .map_or(false, |h| h.contains(&iso) || h.contains(&dmy))
            })
            .or_else(|| {
                links
                    .iter()
                    .find(|e| e.visible && e.text == day && !is_disabled_day(e))
            });
        if let Some(link) = link {
            return self.click(DATE_LINKS, link, ClickMode::Element).await;
        }

        let cells = self.page.elements(CALENDAR_CELLS).await?;
        if let Some(cell) = cells
            .iter()
            .find(|e| e.text == day && e.visible && !is_disabled_day(e))
        {
            let mode = if cell.has_link && cell.link_visible {
                ClickMode::InnerLink
            } else {
                ClickMode::Element
            };
            return self.click(CALENDAR_CELLS, cell, mode).await;
        }

        let cells = self.page.elements(DAY_CELLS).await?;
        if let Some(cell) = cells
            .iter()
            .find(|e| e.text == day && e.visible && is_clickable_day(e))
        {
            let mode = if cell.has_link { ClickMode::InnerLink } else { ClickMode::Element };
            return self.click(DAY_CELLS, cell, mode).await;
        }

        for selector in [
            format!(r#"[data-date="{}"]"#, iso),
            format!(r#"[data-date="{}"]"#, dmy),
            format!(r#"[data-day="{}"]"#, day),
        ] {
            let found = self.page.elements(&selector).await?;
            if let Some(el) = found.first().filter(|e| e.visible) {
                return self.click(&selector, el, ClickMode::Element).await;
            }
        }

        Ok(false)
    }

    async fn align_month(&self, target: NaiveDate, today: NaiveDate) -> Result<()> {
        let titles = self.page.elements(MONTH_TITLE).await?;
        let Some((month, year)) = titles
            .first()
            .and_then(|t| parse_month_title(&t.text, today.year()))
        else {
            return Ok(());
        };

        let diff = (target.year() - year) * 12 + (target.month() as i32 - month as i32);
        let selector = match diff {
            0 => return Ok(()),
            d if d > 0 => NEXT_MONTH,
            _ => PREV_MONTH,
        };
        let control = ClickTarget::new(selector, 0, ClickMode::Element);
        for _ in 0..diff.abs().min(MAX_MONTH_STEPS) {
            if !self.page.click(&control).await? {
                break;
            }
            self.pacer.pause(400, 600).await;
        }
        self.pacer.pause(1500, 2000).await;
        Ok(())
    }

    async fn next_day_clicks(&self, days: i64) -> Result<bool> {
        for step in 1..=days {
            self.pacer.pause(1200, 1800).await;
            if !self.click_next_day().await? {
                warn!("No next-day control on step {}/{}", step, days);
                return Ok(false);
            }
            debug!("Next day {}/{}", step, days);
            self.settle().await;
        }
        Ok(true)
    }

    async fn click_next_day(&self) -> Result<bool> {
        let labelled = self.page.elements(NEXT_DAY_TEXT).await?;
        for el in labelled.iter().filter(|e| NEXT_DAY_LABEL.is_match(&e.text) || e.text == ">") {
            let mode = if el.is_link_or_button() {
                ClickMode::Element
            } else if el.in_clickable {
                ClickMode::ClosestClickable
            } else {
                continue;
            };
            return self.click(NEXT_DAY_TEXT, el, mode).await;
        }

        for selector in NEXT_DAY_SELECTORS {
            let found = self.page.elements(selector).await?;
            if let Some(el) = found.first().filter(|e| e.visible) {
                return self.click(selector, el, ClickMode::Element).await;
            }
        }

        let arrows = self.page.elements(ARROWS).await?;
        if let Some(arrow) = arrows.iter().find(|e| e.visible && is_next_arrow(e)) {
            return self.click(ARROWS, arrow, ClickMode::Element).await;
        }

        Ok(false)
    }

    async fn link_day_text(&self, target: NaiveDate) -> Result<bool> {
        let day = target.day().to_string();
        let links = self.page.elements(DAY_LINKS).await?;
        let candidates: Vec<&ElementInfo> = links
            .iter()
            .filter(|e| e.text == day && e.visible && !e.disabled && !e.has_class("disabled"))
            .collect();

        let chosen = candidates
            .iter()
            .find(|e| looks_like_date_link(e))
            .or_else(|| candidates.first());
        match chosen {
            Some(el) => self.click(DAY_LINKS, el, ClickMode::Element).await,
            None => Ok(false),
        }
    }

    async fn click(&self, selector: &str, el: &ElementInfo, mode: ClickMode) -> Result<bool> {
        self.page
            .click(&ClickTarget::new(selector, el.index, mode))
            .await
    }
}

fn is_disabled_day(el: &ElementInfo) -> bool {
    el.disabled || DISABLED_CLASSES.iter().any(|c| el.has_class(c))
}

fn is_clickable_day(el: &ElementInfo) -> bool {
    el.is_link_or_button() || el.has_onclick || el.has_link || !el.has_class("disabled")
}

fn is_next_arrow(el: &ElementInfo) -> bool {
    ARROW_TEXT.contains(&el.text.as_str())
        || el.text.to_lowercase().contains("next")
        || el
            .aria_label
            .as_deref()
            .map_or(false, |l| l.to_lowercase().contains("next"))
        || el.has_class("next")
}

fn looks_like_date_link(el: &ElementInfo) -> bool {
    el.href
        .as_deref()
        .map_or(false, |h| h.contains("date=") || h.contains("day="))
        || el.has_class("date")
        || el.has_class("calendar")
}
