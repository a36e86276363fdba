//! Ledger page keys and ordering-day arithmetic.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sheet title format for dated ledger pages (`18/10/26`).
const PAGE_TITLE_FORMAT: &str = "%d/%m/%y";

/// Upper bound on how far ahead an ordering day is searched for.
const MAX_LOOKAHEAD_DAYS: usize = 366;

/// Identifies one dated ledger page, i.e. one day's fulfilment batch.
///
/// Displays (and parses) as the page title used in the backing spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Wraps a calendar date.
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The calendar date of this page.
    pub const fn date(self) -> NaiveDate {
        self.0
    }

    /// The sheet title of this page, e.g. `18/10/26`.
    pub fn page_title(self) -> String {
        self.0.format(PAGE_TITLE_FORMAT).to_string()
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(PAGE_TITLE_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), PAGE_TITLE_FORMAT).map(Self)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The days on which the fulfilment process runs.
///
/// Late votes are rolled forward to the next ordering day, skipping gaps such
/// as weekends and any explicitly closed dates. Configuring all seven weekdays
/// with no closed dates disables roll-forward entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingCalendar {
    /// Weekdays on which lunch is ordered.
    pub ordering_days: Vec<Weekday>,

    /// Individual dates with no fulfilment (holidays, closures).
    pub closed_dates: Vec<NaiveDate>,
}

impl Default for OrderingCalendar {
    fn default() -> Self {
        Self {
            ordering_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            closed_dates: Vec::new(),
        }
    }
}

impl OrderingCalendar {
    /// A calendar where every day is an ordering day.
    pub fn every_day() -> Self {
        Self {
            ordering_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
            closed_dates: Vec::new(),
        }
    }

    /// Adds a closed date, returning the updated calendar.
    #[must_use]
    pub fn with_closed_date(mut self, date: NaiveDate) -> Self {
        self.closed_dates.push(date);
        self
    }

    /// Returns `true` if fulfilment runs on `date`.
    pub fn is_ordering_day(&self, date: NaiveDate) -> bool {
        self.ordering_days.contains(&date.weekday()) && !self.closed_dates.contains(&date)
    }

    /// The first ordering day on or after `date`.
    pub fn on_or_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        date.iter_days()
            .take(MAX_LOOKAHEAD_DAYS)
            .find(|day| self.is_ordering_day(*day))
    }

    /// The first ordering day strictly after `date`.
    pub fn next_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.on_or_after(date.succ_opt()?)
    }
}
