use std::sync::LazyLock;

use chrono::{Month, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::error::ExtractionFailure;
use super::event::{Event, EventTime, Importance};
use super::normalize::normalize;
use super::partition::MonthPartition;

pub const TABLE_SELECTOR: &str = "table.calendar__table";
pub const DAY_BREAKER_CLASS: &str = "calendar__row--day-breaker";
pub const EVENT_ID_ATTR: &str = "data-event-id";

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).expect("Selector is valid CSS"));
    };
}

selector!(TABLE, TABLE_SELECTOR);
selector!(ROW, "tr");
selector!(CELL, "td");
selector!(TIME, "td.calendar__time");
selector!(CURRENCY, "td.calendar__currency");
selector!(TITLE, ".calendar__event-title");
selector!(EVENT, "td.calendar__event");
selector!(IMPACT, "td.calendar__impact span");
selector!(ACTUAL, "td.calendar__actual");
selector!(FORECAST, "td.calendar__forecast");
selector!(PREVIOUS, "td.calendar__previous");

static DAY_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+(\d{1,2})\b")
        .expect("Day fragment pattern is valid")
});

/// Rows that could not be used as they were.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Anomalies {
    /// Event rows seen before any day-breaker.
    pub orphan_rows: usize,
    /// Day-breakers without a readable date.
    pub unreadable_days: usize,
    /// Fields replaced by their default value.
    pub defaulted_fields: usize,
}

impl Anomalies {
    pub const fn total(&self) -> usize {
        self.orphan_rows + self.unreadable_days + self.defaulted_fields
    }
}

#[derive(Debug, Default)]
pub struct ParsedCalendar {
    pub partition: MonthPartition,
    pub anomalies: Anomalies,
}

/// Walks the calendar table of a rendered page.
///
/// Day-breaker rows set the date for the event rows that follow them. The
/// date fragment only carries month and day; the year is taken from the
/// requested month and moved by one when a December page shows January days
/// (or the other way around).
///
/// # Errors
/// Fails only when the document has no calendar table. Broken rows are
/// counted in [`Anomalies`] instead.
pub fn parse_calendar(html: &str, month: Month, year: i32) -> Result<ParsedCalendar, ExtractionFailure> {
    let document = Html::parse_document(html);
    let table = document
        .select(&TABLE)
        .next()
        .ok_or_else(|| ExtractionFailure::structural(TABLE_SELECTOR))?;

    let mut parsed = ParsedCalendar::default();
    let mut current_date: Option<NaiveDate> = None;
    let mut last_time: Option<EventTime> = None;

    for row in table.select(&ROW) {
        if is_day_breaker(&row) {
            match day_breaker_date(&row, month, year) {
                Some(date) => {
                    log::trace!("Day-breaker for {date}");
                    current_date = Some(date);
                    last_time = None;
                }
                None => {
                    log::debug!("Day-breaker without a date: {:?}", text(&row));
                    parsed.anomalies.unreadable_days += 1;
                }
            }
            continue;
        }

        let Some(id) = row.value().attr(EVENT_ID_ATTR) else {
            continue;
        };

        let Some(date) = current_date else {
            log::debug!("Event row {id} before any date, skipping");
            parsed.anomalies.orphan_rows += 1;
            continue;
        };

        let event = event_row(&row, date, last_time, &mut parsed.anomalies);
        last_time = Some(event.time);
        parsed.partition.push(event);
    }

    Ok(parsed)
}

fn event_row(
    row: &ElementRef,
    date: NaiveDate,
    last_time: Option<EventTime>,
    anomalies: &mut Anomalies,
) -> Event {
    let mut defaulted = |field: &str| {
        log::trace!("Row on {date} has no {field}");
        anomalies.defaulted_fields += 1;
    };

    let time = match time(row) {
        Some(cell) if cell.is_empty() => last_time.unwrap_or(EventTime::AllDay),
        Some(cell) => EventTime::parse(&cell).unwrap_or(EventTime::AllDay),
        None => {
            defaulted("time");
            EventTime::AllDay
        }
    };

    let currency = currency(row).unwrap_or_else(|| {
        defaulted("currency");
        String::new()
    });

    let name = name(row).map(|name| normalize(&name)).unwrap_or_else(|| {
        defaulted("name");
        String::new()
    });

    let importance = importance(row).unwrap_or_else(|| {
        defaulted("importance");
        Importance::Unknown
    });

    Event {
        date,
        time,
        currency,
        name,
        importance,
        id: row.value().attr(EVENT_ID_ATTR).map(ToOwned::to_owned),
        actual: cell_text(row, &ACTUAL).filter(|s| !s.is_empty()),
        forecast: cell_text(row, &FORECAST).filter(|s| !s.is_empty()),
        previous: cell_text(row, &PREVIOUS).filter(|s| !s.is_empty()),
    }
}

pub fn is_day_breaker(row: &ElementRef) -> bool {
    row.value().classes().any(|class| class == DAY_BREAKER_CLASS)
}

pub fn day_breaker_date(row: &ElementRef, month: Month, year: i32) -> Option<NaiveDate> {
    let cell = row.select(&CELL).next().map_or_else(|| text(row), |td| text(&td));
    let captures = DAY_FRAGMENT.captures(&cell)?;
    let row_month: Month = captures.get(1)?.as_str().parse().ok()?;
    let day: u32 = captures.get(2)?.as_str().parse().ok()?;

    let year = match (month, row_month) {
        (Month::December, Month::January) => year + 1,
        (Month::January, Month::December) => year - 1,
        _ => year,
    };

    NaiveDate::from_ymd_opt(year, row_month.number_from_month(), day)
}

/// Text of the time cell; empty when the source repeats the previous time.
pub fn time(row: &ElementRef) -> Option<String> {
    cell_text(row, &TIME)
}

pub fn currency(row: &ElementRef) -> Option<String> {
    cell_text(row, &CURRENCY)
}

pub fn name(row: &ElementRef) -> Option<String> {
    cell_text(row, &TITLE)
        .or_else(|| cell_text(row, &EVENT))
        .filter(|name| !name.is_empty())
}

pub fn importance(row: &ElementRef) -> Option<Importance> {
    row.select(&IMPACT)
        .next()
        .and_then(|span| span.value().attr("class"))
        .map(Importance::from_marker)
}

fn cell_text(row: &ElementRef, selector: &Selector) -> Option<String> {
    row.select(selector).next().map(|cell| text(&cell))
}

fn text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
