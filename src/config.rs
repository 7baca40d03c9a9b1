use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use chrono_tz::Tz;
use url::Url;

use crate::calendar::RefreshPolicy;

#[derive(Debug, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub refresh: Refresh,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fetcher {
    #[default]
    Browser,
    Http,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct Source {
    pub url: Url,
    pub fetcher: Fetcher,
    /// Timezone the calendar page displays its dates in
    pub timezone: Tz,
    pub user_agent: String,
    pub headless: bool,
    pub scroll_wait_ms: u64,
    pub scroll_max_steps: u32,
    pub element_timeout_secs: u64,
    pub page_timeout_secs: u64,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            url: default_url(),
            fetcher: Fetcher::default(),
            timezone: Tz::America__New_York,
            user_agent: String::from(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0 Safari/537.36",
            ),
            headless: true,
            scroll_wait_ms: 2000,
            scroll_max_steps: 20,
            element_timeout_secs: 10,
            page_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Limits {
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: f64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Limits {
    pub fn min_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.min_delay_secs).unwrap_or_default()
    }

    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_delay_secs: default_min_delay_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Refresh {
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,
    #[serde(default = "default_boundary_days")]
    pub boundary_days: u32,
}

impl Refresh {
    pub fn policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            interval: TimeDelta::hours(i64::from(self.interval_hours)),
            boundary_days: self.boundary_days,
        }
    }
}

impl Default for Refresh {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            boundary_days: default_boundary_days(),
        }
    }
}

pub fn init(path: PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
    let string = std::fs::read_to_string(path)?;

    parse(&string)
}

pub fn parse(string: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config: Config = toml::from_str(string)?;

    if config.limits.min_delay().is_zero() && config.limits.min_delay_secs != 0.0 {
        return Err(format!("Invalid min_delay_secs: {}", config.limits.min_delay_secs).into());
    }
    if config.source.scroll_max_steps == 0 {
        return Err("Invalid scroll_max_steps: 0, need at least one scroll".into());
    }

    Ok(config)
}

fn default_url() -> Url {
    Url::parse("https://www.forexfactory.com/calendar").expect("default calendar url is valid")
}

const fn default_min_delay_secs() -> f64 {
    2.0
}

const fn default_cache_ttl_secs() -> u64 {
    3600
}

const fn default_interval_hours() -> u32 {
    24
}

const fn default_boundary_days() -> u32 {
    7
}
