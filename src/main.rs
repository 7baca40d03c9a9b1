#![warn(
    clippy::all,
    // clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    // clippy::unwrap_used
)]
use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Utc};
use clap::Parser;
use cli::{Cli, Command, Filter};
use econ_calendar::calendar::{
    sort_chronologically, BrowserSource, CalendarExtractor, Event, EventFilter, EventStore, HttpSource,
    MonthKey, PageSource, RateLimiter, RefreshScheduler,
};
use econ_calendar::config::{self, Config, Fetcher};
use econ_calendar::{logger, ote};

mod cli;

type Scheduler = RefreshScheduler<CalendarExtractor<Box<dyn PageSource>>>;

fn main() -> anyhow::Result<()> {
    logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Ote { low, high, threshold } => print_ote(low, high, threshold),
        command => {
            let config = config::init(cli.config)
                .map_err(|e| anyhow!("Could not load the configuration file: {e}"))?;
            log::debug!("{config:?}");

            run(command, &config, cli.json)
        }
    }
}

fn run(command: Command, config: &Config, json: bool) -> anyhow::Result<()> {
    let scheduler = build(config);
    let store = scheduler.store();
    let now = Utc::now().with_timezone(&config.source.timezone).naive_local();

    match command {
        Command::Refresh { force } => {
            let refreshed = if force {
                scheduler.force_refresh(now)
            } else {
                scheduler.ensure_fresh(now)
            };

            if !refreshed {
                bail!("Refresh failed");
            }

            for key in [MonthKey::Previous, MonthKey::Current, MonthKey::Next] {
                let partition = store.get_month(key);
                println!("{key}: {} days, {} events", partition.len_days(), partition.len_events());
            }
        }
        Command::Day { date } => {
            refresh_for_query(&scheduler, now);

            let date = date.unwrap_or_else(|| now.date());
            let mut events = store.events_for_date(date);
            sort_chronologically(&mut events);

            print_days(&BTreeMap::from([(date, events)]), json)?;
        }
        Command::Range { start, end, filter } => {
            if end < start {
                bail!("End date {end} is before start date {start}");
            }
            refresh_for_query(&scheduler, now);

            print_days(&store.events_in_range(start, end, &event_filter(filter)), json)?;
        }
        Command::Week { days, filter } => {
            refresh_for_query(&scheduler, now);

            let start = now.date();
            let end = week_end(start, days)
                .with_context(|| format!("{days} days from {start} is out of range"))?;

            print_days(&store.events_in_range(start, end, &event_filter(filter)), json)?;
        }
        Command::Ote { low, high, threshold } => print_ote(low, high, threshold)?,
    }

    Ok(())
}

fn build(config: &Config) -> Arc<Scheduler> {
    let limiter = Arc::new(RateLimiter::new(config.limits.min_delay()));
    let store = Arc::new(EventStore::new(config.limits.cache_ttl(), Arc::clone(&limiter)));

    let source: Box<dyn PageSource> = match config.source.fetcher {
        Fetcher::Browser => Box::new(BrowserSource::new(&config.source)),
        Fetcher::Http => Box::new(HttpSource::new(&config.source)),
    };
    let extractor = CalendarExtractor::new(source, config.source.url.clone());

    Arc::new(RefreshScheduler::new(extractor, store, limiter, config.refresh.policy()))
}

/// Stale data is still served when the refresh fails.
fn refresh_for_query(scheduler: &Scheduler, now: NaiveDateTime) {
    if !scheduler.ensure_fresh(now) {
        log::warn!("Could not refresh the calendar, answering from held data");
    }
}

/// Last day of a `days` long window starting at `start`, which counts as one.
fn week_end(start: NaiveDate, days: u32) -> Option<NaiveDate> {
    start.checked_add_signed(TimeDelta::days(i64::from(days.max(1)) - 1))
}

fn event_filter(filter: Filter) -> EventFilter {
    let mut event_filter = EventFilter::default();

    if let Some(currency) = filter.currency {
        event_filter = event_filter.currency(currency.to_uppercase());
    }
    if !filter.importance.is_empty() {
        event_filter = event_filter.importance(filter.importance);
    }

    event_filter
}

fn print_days(days: &BTreeMap<NaiveDate, Vec<Event>>, json: bool) -> anyhow::Result<()> {
    if json {
        let json = serde_json::to_string_pretty(days).context("Could not serialize events")?;
        println!("{json}");
        return Ok(());
    }

    for (date, events) in days {
        println!("{}", date.format("%a %b %-d %Y"));

        if events.is_empty() {
            println!("  no events");
        }
        for event in events {
            println!(
                "  {:>9}  {:<4} {:<12} {}",
                event.time.to_string(),
                event.currency,
                event.importance.to_string(),
                event.name
            );
        }
    }

    Ok(())
}

fn print_ote(low: f64, high: f64, threshold: f64) -> anyhow::Result<()> {
    let bullish = ote::bullish(low, high, threshold)?;
    let bearish = ote::bearish(high, low, threshold)?;

    println!("Bullish OTE: {bullish}");
    println!("Bearish OTE: {bearish}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_counts_today_as_the_first_day() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        assert_eq!(week_end(start, 7), NaiveDate::from_ymd_opt(2026, 10, 25));
        assert_eq!(week_end(start, 1), Some(start));
        assert_eq!(week_end(start, 0), Some(start));
    }

    #[test]
    fn week_past_the_calendar_range_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        assert_eq!(week_end(start, 4_000_000_000), None);
    }
}
