use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Serialize, Serializer};

/// One row of the economic calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub date: NaiveDate,
    pub time: EventTime,
    pub currency: String,
    pub name: String,
    pub importance: Importance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl Event {
    pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            time: EventTime::AllDay,
            currency: String::new(),
            name: name.into(),
            importance: Importance::Unknown,
            id: None,
            actual: None,
            forecast: None,
            previous: None,
        }
    }

    pub fn with_time(mut self, time: EventTime) -> Self {
        self.time = time;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }
}

/// Sorts a day's events by time, keeping the source order for equal times.
pub fn sort_chronologically(events: &mut [Event]) {
    events.sort_by_key(|event| event.time);
}

/// Time of day an event is scheduled for.
///
/// Ordering puts all-day entries first and tentative ones last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventTime {
    AllDay,
    Clock(NaiveTime),
    Tentative,
}

impl EventTime {
    /// Parses the text of a time cell: `8:30am`, `All Day` or `Tentative`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        if text.eq_ignore_ascii_case("all day") {
            return Some(Self::AllDay);
        }

        if text.eq_ignore_ascii_case("tentative") {
            return Some(Self::Tentative);
        }

        NaiveTime::parse_from_str(&text.to_ascii_uppercase(), "%I:%M%p")
            .ok()
            .map(Self::Clock)
    }
}

impl Display for EventTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::AllDay => f.write_str("All Day"),
            Self::Tentative => f.write_str("Tentative"),
            Self::Clock(time) => write!(f, "{}", time.format("%-I:%M%P")),
        }
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Expected market impact of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Importance {
    High,
    Medium,
    Low,
    NonEconomic,
    Unknown,
}

impl Importance {
    pub const ALL: [Self; 5] = [
        Self::High,
        Self::Medium,
        Self::Low,
        Self::NonEconomic,
        Self::Unknown,
    ];

    /// Maps the style marker of an impact indicator (`icon--ff-impact-red`).
    pub fn from_marker(marker: &str) -> Self {
        let marker = marker.to_ascii_lowercase();

        if marker.contains("red") {
            Self::High
        } else if marker.contains("ora") {
            Self::Medium
        } else if marker.contains("yel") {
            Self::Low
        } else {
            Self::NonEconomic
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::NonEconomic => "Non-Economic",
            Self::Unknown => "Unknown",
        }
    }
}

impl Display for Importance {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl Serialize for Importance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown importance '{0}', expected one of high, medium, low, non-economic, unknown")]
pub struct ParseImportanceError(String);

impl FromStr for Importance {
    type Err = ParseImportanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");

        Self::ALL
            .into_iter()
            .find(|importance| importance.as_str().to_ascii_lowercase().replace('-', "") == wanted)
            .ok_or_else(|| ParseImportanceError(s.to_owned()))
    }
}
