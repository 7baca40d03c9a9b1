use chrono::{Datelike, Month, Months, NaiveDate};

use super::partition::MonthKey;

/// A calendar month of a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(self) -> Option<NaiveDate> {
        self.next().first_day()?.pred_opt()
    }

    pub fn next(self) -> Self {
        self.first_day()
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .map_or(self, Self::of)
    }

    pub fn prev(self) -> Self {
        self.first_day()
            .and_then(|first| first.checked_sub_months(Months::new(1)))
            .map_or(self, Self::of)
    }

    pub fn chrono_month(self) -> Option<Month> {
        u8::try_from(self.month).ok().and_then(|m| Month::try_from(m).ok())
    }
}

/// Months that a refresh on `today` has to extract.
///
/// The current month always; the previous one during the first
/// `boundary_days` of a month and the next one during the last
/// `boundary_days`.
pub fn months_needed(today: NaiveDate, boundary_days: u32) -> Vec<(MonthKey, YearMonth)> {
    let current = YearMonth::of(today);
    let mut months = vec![(MonthKey::Current, current)];

    if today.day() <= boundary_days {
        months.push((MonthKey::Previous, current.prev()));
    }

    let days_left = current
        .last_day()
        .map_or(0, |last| (last - today).num_days());
    if days_left < i64::from(boundary_days) {
        months.push((MonthKey::Next, current.next()));
    }

    months
}
