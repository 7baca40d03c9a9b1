use chrono::Month;
use url::Url;

use super::error::ExtractionFailure;
use super::extract::parse_calendar;
use super::partition::MonthPartition;
use super::source::{calendar_url, PageSource};

/// Produces one month of calendar events.
///
/// The refresh scheduler only talks to this trait, so tests can swap the live
/// page for canned partitions.
pub trait Extractor: Send + Sync {
    /// # Errors
    /// Returns a failure when the month could not be read completely. No
    /// partial partition is handed out in that case.
    fn extract(&self, month: Month, year: i32) -> Result<MonthPartition, ExtractionFailure>;
}

impl<E: Extractor + ?Sized> Extractor for Box<E> {
    fn extract(&self, month: Month, year: i32) -> Result<MonthPartition, ExtractionFailure> {
        (**self).extract(month, year)
    }
}

/// Extracts months from the live calendar page.
#[derive(Debug)]
pub struct CalendarExtractor<S> {
    source: S,
    base_url: Url,
}

impl<S: PageSource> CalendarExtractor<S> {
    pub const fn new(source: S, base_url: Url) -> Self {
        Self { source, base_url }
    }

    pub const fn source(&self) -> &S {
        &self.source
    }
}

impl<S: PageSource> Extractor for CalendarExtractor<S> {
    fn extract(&self, month: Month, year: i32) -> Result<MonthPartition, ExtractionFailure> {
        let url = calendar_url(&self.base_url, month, year);
        let html = self.source.fetch(&url)?;
        let parsed = parse_calendar(&html, month, year)?;

        if parsed.anomalies.total() > 0 {
            log::warn!(
                orphan_rows = parsed.anomalies.orphan_rows,
                unreadable_days = parsed.anomalies.unreadable_days,
                defaulted_fields = parsed.anomalies.defaulted_fields;
                "Recovered from malformed rows in {} {year}", month.name()
            );
        }

        log::info!(
            "Extracted {} {year}: {} days, {} events",
            month.name(),
            parsed.partition.len_days(),
            parsed.partition.len_events(),
        );

        Ok(parsed.partition)
    }
}
