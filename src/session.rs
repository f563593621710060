//! Browser sessions
//!
//! One WebDriver session per venue scrape. [`BrowserPage`] is the small
//! surface the navigation and extraction code needs from a page, so the
//! engine can be driven by something other than a live Chrome.

use crate::config::ScraperConfig;
use crate::extract::snapshot::{PageSnapshot, CAPTURE_SCRIPT};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::prelude::*;
use tracing::{debug, warn};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(5);

/// What the page tells us about one element matched by a selector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementInfo {
    /// Position in the selector's match list, used to click it later.
    pub index: usize,
    pub tag: String,
    pub text: String,
    pub href: Option<String>,
    pub class_name: String,
    pub aria_label: Option<String>,
    pub visible: bool,
    /// `disabled` or `aria-disabled="true"` or `data-other-month`.
    pub disabled: bool,
    pub has_onclick: bool,
    pub has_link: bool,
    pub link_visible: bool,
    /// Inside (or is) an `a`/`button`.
    pub in_clickable: bool,
}

impl ElementInfo {
    pub fn is_link_or_button(&self) -> bool {
        self.tag.eq_ignore_ascii_case("a") || self.tag.eq_ignore_ascii_case("button")
    }

    pub fn has_class(&self, needle: &str) -> bool {
        self.class_name.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClickMode {
    /// The matched element itself.
    Element,
    /// The first link inside the matched element.
    InnerLink,
    /// The nearest `a`/`button` containing the matched element.
    ClosestClickable,
}

/// The `index`-th match of `selector`, clicked according to `mode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickTarget {
    pub selector: String,
    pub index: usize,
    pub mode: ClickMode,
}

impl ClickTarget {
    pub fn new(selector: &str, index: usize, mode: ClickMode) -> Self {
        Self {
            selector: selector.to_string(),
            index,
            mode,
        }
    }
}

#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;
    async fn current_url(&self) -> Result<String>;
    /// Describe every element matching `selector`, in document order.
    async fn elements(&self, selector: &str) -> Result<Vec<ElementInfo>>;
    /// Returns false when the target no longer exists.
    async fn click(&self, target: &ClickTarget) -> Result<bool>;
    async fn capture(&self, loose_selector: Option<&str>) -> Result<PageSnapshot>;
    async fn source(&self) -> Result<String>;
    async fn screenshot(&self, path: &Path) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Check that sessions can be created at all.
    async fn preflight(&self) -> Result<()> {
        Ok(())
    }

    async fn open(&self) -> Result<Box<dyn BrowserPage>>;
}

/// Opens Chrome sessions through a running ChromeDriver.
pub struct WebDriverSessionFactory {
    webdriver_url: String,
    headless: bool,
    window_size: (u32, u32),
    page_timeout: Duration,
    client: reqwest::Client,
}

impl WebDriverSessionFactory {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.trim_end_matches('/').to_string(),
            headless: config.headless,
            window_size: (config.viewport.width, config.viewport.height),
            page_timeout: config.page_timeout(),
            client: reqwest::Client::new(),
        }
    }

    fn chrome_args(&self, user_agent: &str) -> Vec<String> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            format!("--window-size={},{}", self.window_size.0, self.window_size.1),
            "--disable-blink-features=AutomationControlled".to_string(),
            format!("--user-agent={}", user_agent),
        ];
        if self.headless {
            args.insert(0, "--headless=new".to_string());
        }
        args
    }
}

#[async_trait]
impl SessionFactory for WebDriverSessionFactory {
    async fn preflight(&self) -> Result<()> {
        let url = format!("{}/status", self.webdriver_url);
        let response = self
            .client
            .get(&url)
            .timeout(PREFLIGHT_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("WebDriver not reachable at {}", self.webdriver_url))?;
        if !response.status().is_success() {
            bail!("WebDriver status check returned {}", response.status());
        }
        Ok(())
    }

    async fn open(&self) -> Result<Box<dyn BrowserPage>> {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        let mut caps = DesiredCapabilities::chrome();
        caps.add_chrome_option("args", self.chrome_args(user_agent))?;
        caps.add_chrome_option("excludeSwitches", vec!["enable-automation"])?;

        let driver = WebDriver::new(&self.webdriver_url, caps)
            .await
            .context("Failed to connect to ChromeDriver")?;

        let configured = async {
            driver.set_page_load_timeout(self.page_timeout).await?;
            driver.set_script_timeout(self.page_timeout).await?;
            // Runs before any page script, on every document the session loads.
            ChromeDevTools::new(driver.handle.clone())
                .execute_cdp_with_params(ADD_INIT_SCRIPT, stealth_params())
                .await?;
            Ok::<(), WebDriverError>(())
        }
        .await;

        // Never leak a browser whose setup failed.
        if let Err(e) = configured {
            if let Err(quit_err) = driver.quit().await {
                warn!("Failed to quit browser after setup error: {}", quit_err);
            }
            return Err(e).context("Failed to configure browser session");
        }

        debug!("Opened browser session ({})", user_agent);
        Ok(Box::new(WebDriverPage { driver }))
    }
}

/// Hides the usual automation tells from page scripts.
const STEALTH_SCRIPT: &str = r#"
try {
  Object.defineProperty(navigator, 'webdriver', { get: () => false });
  window.chrome = window.chrome || { runtime: {} };
} catch (e) {}
"#;

const ADD_INIT_SCRIPT: &str = "Page.addScriptToEvaluateOnNewDocument";

fn stealth_params() -> serde_json::Value {
    json!({ "source": STEALTH_SCRIPT })
}

const ELEMENTS_SCRIPT: &str = r#"
const selector = arguments[0];
return Array.from(document.querySelectorAll(selector)).map((el, index) => {
  const link = el.querySelector('a');
  return {
    index,
    tag: el.tagName,
    text: (el.textContent || '').trim().slice(0, 200),
    href: el.getAttribute('href'),
    className: typeof el.className === 'string' ? el.className : '',
    ariaLabel: el.getAttribute('aria-label'),
    visible: el.offsetParent !== null,
    disabled: el.hasAttribute('disabled') || el.getAttribute('aria-disabled') === 'true' || el.hasAttribute('data-other-month'),
    hasOnclick: el.onclick !== null || el.hasAttribute('onclick'),
    hasLink: link !== null,
    linkVisible: link !== null && link.offsetParent !== null,
    inClickable: el.closest('a, button') !== null
  };
});
"#;

const CLICK_SCRIPT: &str = r#"
const [selector, index, mode] = arguments;
const el = document.querySelectorAll(selector)[index];
if (!el) return false;
let target = el;
if (mode === 'innerLink') target = el.querySelector('a');
else if (mode === 'closestClickable') target = el.closest('a, button');
if (!target) return false;
target.click();
return true;
"#;

pub struct WebDriverPage {
    driver: WebDriver,
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.driver
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {}", url))
    }

    async fn current_url(&self) -> Result<String> {
        let url = self.driver.current_url().await.context("Failed to read current URL")?;
        Ok(url.to_string())
    }

    async fn elements(&self, selector: &str) -> Result<Vec<ElementInfo>> {
        let ret = self
            .driver
            .execute(ELEMENTS_SCRIPT, vec![json!(selector)])
            .await
            .with_context(|| format!("Failed to query {}", selector))?;
        serde_json::from_value(ret.json().clone()).context("Unexpected element listing")
    }

    async fn click(&self, target: &ClickTarget) -> Result<bool> {
        let ret = self
            .driver
            .execute(
                CLICK_SCRIPT,
                vec![json!(target.selector), json!(target.index), json!(target.mode)],
            )
            .await
            .with_context(|| format!("Failed to click {}[{}]", target.selector, target.index))?;
        Ok(ret.json().as_bool().unwrap_or(false))
    }

    async fn capture(&self, loose_selector: Option<&str>) -> Result<PageSnapshot> {
        let ret = self
            .driver
            .execute(CAPTURE_SCRIPT, vec![json!(loose_selector)])
            .await
            .context("Page capture script failed")?;
        serde_json::from_value(ret.json().clone()).context("Unexpected page capture payload")
    }

    async fn source(&self) -> Result<String> {
        self.driver.source().await.context("Failed to get page source")
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.driver
            .screenshot(path)
            .await
            .with_context(|| format!("Failed to save screenshot to {}", path.display()))
    }

    async fn close(&self) -> Result<()> {
        self.driver.clone().quit().await.context("Failed to quit browser")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_args_follow_config() {
        let mut config = ScraperConfig::default();
        config.viewport.width = 1280;
        config.viewport.height = 800;
        let factory = WebDriverSessionFactory::new(&config);
        let args = factory.chrome_args(USER_AGENTS[0]);
        assert_eq!(args[0], "--headless=new");
        assert!(args.contains(&"--window-size=1280,800".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0")));

        config.headless = false;
        let args = WebDriverSessionFactory::new(&config).chrome_args(USER_AGENTS[1]);
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn test_element_info_deserializes_from_script_payload() {
        let payload = json!([{
            "index": 3, "tag": "A", "text": "21", "href": "?date=2026-10-21",
            "className": "ui-state-default", "ariaLabel": null, "visible": true,
            "disabled": false, "hasOnclick": false, "hasLink": false,
            "linkVisible": false, "inClickable": true
        }]);
        let infos: Vec<ElementInfo> = serde_json::from_value(payload).unwrap();
        assert_eq!(infos[0].index, 3);
        assert!(infos[0].is_link_or_button());
        assert!(infos[0].has_class("state-default"));
    }

    #[test]
    fn test_stealth_registered_for_new_documents() {
        assert_eq!(ADD_INIT_SCRIPT, "Page.addScriptToEvaluateOnNewDocument");
        let params = stealth_params();
        let source = params["source"].as_str().unwrap();
        assert!(source.contains("navigator, 'webdriver'"));
        assert_eq!(params.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_click_mode_wire_names() {
        assert_eq!(json!(ClickMode::InnerLink), json!("innerLink"));
        assert_eq!(json!(ClickMode::ClosestClickable), json!("closestClickable"));
    }

    #[tokio::test]
    async fn test_preflight_fails_without_driver() {
        let config = ScraperConfig {
            webdriver_url: "http://127.0.0.1:1".to_string(),
            ..ScraperConfig::default()
        };
        let factory = WebDriverSessionFactory::new(&config);
        assert!(factory.preflight().await.is_err());
    }
}
