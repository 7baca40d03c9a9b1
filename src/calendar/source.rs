use std::ffi::OsStr;
use std::time::{Duration, Instant};

use chrono::Month;
use headless_chrome::{Browser, LaunchOptions, Tab};
use ureq::Agent;
use url::Url;

use crate::config::Source as SourceConfig;
use crate::logger::LogExt;

use super::error::ExtractionFailure;
use super::extract::TABLE_SELECTOR;

/// Something that can hand out the rendered markup of a calendar page.
pub trait PageSource: Send + Sync {
    /// # Errors
    /// Returns a failure if the page could not be loaded in time.
    fn fetch(&self, url: &Url) -> Result<String, ExtractionFailure>;
}

impl<S: PageSource + ?Sized> PageSource for Box<S> {
    fn fetch(&self, url: &Url) -> Result<String, ExtractionFailure> {
        (**self).fetch(url)
    }
}

/// Builds `https://host/calendar?month=oct.2026` from the configured base url.
pub fn calendar_url(base_url: &Url, month: Month, year: i32) -> Url {
    let abbreviation = month.name()[..3].to_ascii_lowercase();
    let mut url = base_url.clone();

    url.query_pairs_mut()
        .clear()
        .append_pair("month", &format!("{abbreviation}.{year}"));

    url
}

/// Renders the page in a headless Chrome.
///
/// Every fetch launches its own browser; it is closed when the fetch returns,
/// whether the page loaded or not.
#[derive(Debug, Clone)]
pub struct BrowserSource {
    headless: bool,
    user_agent: String,
    page_timeout: Duration,
    element_timeout: Duration,
    scroll_wait: Duration,
    scroll_max_steps: u32,
}

impl BrowserSource {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            headless: config.headless,
            user_agent: config.user_agent.clone(),
            page_timeout: Duration::from_secs(config.page_timeout_secs),
            element_timeout: Duration::from_secs(config.element_timeout_secs),
            scroll_wait: Duration::from_millis(config.scroll_wait_ms),
            scroll_max_steps: config.scroll_max_steps,
        }
    }

    fn launch(&self) -> Result<Browser, ExtractionFailure> {
        let options = LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(false)
            .idle_browser_timeout(self.page_timeout + self.scroll_budget() + self.element_timeout)
            .args(vec![
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
            ])
            .build()
            .map_err(|e| ExtractionFailure::unexpected(format!("Invalid launch options: {e}")))?;

        Ok(Browser::new(options).log_error("Could not launch browser")?)
    }

    fn scroll_budget(&self) -> Duration {
        self.scroll_wait * (self.scroll_max_steps + 1)
    }

    /// Scrolls to the bottom until the offset stops moving.
    fn scroll_to_end(&self, tab: &Tab) -> Result<(), ExtractionFailure> {
        let steps = settle_scroll(
            self.scroll_max_steps,
            self.scroll_wait,
            self.scroll_budget(),
            || scroll_offset(tab),
            || {
                tab.evaluate("window.scrollTo(0, document.body.scrollHeight);", false)
                    .log_warn("Scrolling failed")?;
                Ok(())
            },
        )?;

        log::debug!(steps = steps; "Scroll position settled");

        Ok(())
    }
}

/// Alternates `scroll` and `read_offset` until two reads in a row agree.
///
/// Reads once before the first scroll, so `max_steps` scrolls make
/// `max_steps + 1` reads. Returns the number of scrolls it took.
fn settle_scroll<R, S>(
    max_steps: u32,
    wait: Duration,
    budget: Duration,
    mut read_offset: R,
    mut scroll: S,
) -> Result<u32, ExtractionFailure>
where
    R: FnMut() -> Result<f64, ExtractionFailure>,
    S: FnMut() -> Result<(), ExtractionFailure>,
{
    let deadline = Instant::now() + budget;
    let mut previous = read_offset()?;

    for step in 1..=max_steps {
        scroll()?;
        std::thread::sleep(wait);

        let offset = read_offset()?;
        if offset == previous {
            return Ok(step);
        }
        if Instant::now() >= deadline {
            break;
        }
        previous = offset;
    }

    Err(ExtractionFailure::timeout("scroll position", budget))
}

impl PageSource for BrowserSource {
    fn fetch(&self, url: &Url) -> Result<String, ExtractionFailure> {
        let browser = self.launch()?;
        let tab = browser.new_tab().log_error("Could not open tab")?;

        tab.set_default_timeout(self.page_timeout);
        tab.set_user_agent(&self.user_agent, None, None)
            .log_warn("Could not set user agent")?;

        log::info!("Loading {url}");
        tab.navigate_to(url.as_str())
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| ExtractionFailure::timeout("page", self.page_timeout).with_cause(&e))?;

        self.scroll_to_end(&tab)?;

        tab.wait_for_element_with_custom_timeout(TABLE_SELECTOR, self.element_timeout)
            .map_err(|e| ExtractionFailure::timeout(TABLE_SELECTOR, self.element_timeout).with_cause(&e))?;

        Ok(tab.get_content().log_error("Could not read page content")?)
    }
}

fn scroll_offset(tab: &Tab) -> Result<f64, ExtractionFailure> {
    let offset = tab
        .evaluate("window.pageYOffset", false)
        .log_warn("Could not read scroll position")?
        .value
        .and_then(|value| value.as_f64())
        .log_warn("Scroll position is not a number")?;

    Ok(offset)
}

/// Fetches the page without running scripts. Only useful when the server
/// renders the calendar table itself.
#[derive(Debug, Clone)]
pub struct HttpSource {
    agent: Agent,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.page_timeout_secs))
            .user_agent(&config.user_agent)
            .build();

        Self { agent }
    }
}

impl PageSource for HttpSource {
    fn fetch(&self, url: &Url) -> Result<String, ExtractionFailure> {
        log::info!("Requesting {url}");

        let body = self
            .agent
            .get(url.as_str())
            .set("Accept", "text/html")
            .call()?
            .into_string()?;

        Ok(body)
    }
}
