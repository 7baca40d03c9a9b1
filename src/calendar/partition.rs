use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::NaiveDate;

use super::event::Event;

/// One month of extracted events keyed by day.
///
/// Events of a day keep the order they had in the source table. Partitions
/// are built once by the extractor and never changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthPartition {
    days: BTreeMap<NaiveDate, Vec<Event>>,
}

impl MonthPartition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.days.entry(event.date).or_default().push(event);
    }

    pub fn get(&self, date: NaiveDate) -> Option<&[Event]> {
        self.days.get(&date).map(Vec::as_slice)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[Event])> {
        self.days.iter().map(|(date, events)| (*date, events.as_slice()))
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.days.values().flatten()
    }

    pub fn len_days(&self) -> usize {
        self.days.len()
    }

    pub fn len_events(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl FromIterator<Event> for MonthPartition {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        let mut partition = Self::new();
        iter.into_iter().for_each(|event| partition.push(event));
        partition
    }
}

/// Names of the three partitions held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonthKey {
    Previous,
    Current,
    Next,
}

impl MonthKey {
    /// Lookup order used when a date appears in more than one partition.
    pub const PRECEDENCE: [Self; 3] = [Self::Current, Self::Next, Self::Previous];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Previous => "previous_month",
            Self::Current => "current_month",
            Self::Next => "next_month",
        }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn keeps_source_order_within_a_day() {
        let partition: MonthPartition = [
            Event::new(day(2), "second"),
            Event::new(day(1), "first"),
            Event::new(day(2), "third"),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = partition.get(day(2)).unwrap().iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, ["second", "third"]);
        assert_eq!(partition.dates().collect::<Vec<_>>(), [day(1), day(2)]);
        assert_eq!(partition.len_days(), 2);
        assert_eq!(partition.len_events(), 3);
    }

    #[test]
    fn missing_days_are_absent() {
        let partition = MonthPartition::new();

        assert!(partition.is_empty());
        assert!(partition.get(day(5)).is_none());
        assert!(!partition.contains(day(5)));
    }
}
