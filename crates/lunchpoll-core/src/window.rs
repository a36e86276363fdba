//! Daily blackout window and target-page resolution.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{DateKey, OrderingCalendar};

/// Why the resolver refused to pick a ledger page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    /// The instant falls inside the daily blackout window.
    #[error("voting window is closed")]
    WindowClosed,

    /// The calendar has no ordering day within the lookahead horizon.
    #[error("no ordering day is scheduled")]
    NoOrderingDay,
}

/// The daily interval during which the ledger must not change.
///
/// Both bounds belong to the blackout by default. Each boundary can be made
/// exclusive independently; an exclusive boundary instant is treated as
/// outside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingWindow {
    /// Time of day at which voting closes.
    pub start: NaiveTime,

    /// Time of day at which voting reopens.
    pub end: NaiveTime,

    /// Whether `start` itself is inside the blackout.
    #[serde(default = "default_inclusive")]
    pub include_start: bool,

    /// Whether `end` itself is inside the blackout.
    #[serde(default = "default_inclusive")]
    pub include_end: bool,
}

fn default_inclusive() -> bool {
    true
}

impl Default for VotingWindow {
    fn default() -> Self {
        Self::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            NaiveTime::from_hms_opt(15, 7, 0).unwrap_or(NaiveTime::MIN),
        )
    }
}

impl VotingWindow {
    /// Creates a window with both bounds inside the blackout.
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start,
            end,
            include_start: true,
            include_end: true,
        }
    }

    /// Overrides boundary inclusivity.
    #[must_use]
    pub const fn with_boundaries(mut self, include_start: bool, include_end: bool) -> Self {
        self.include_start = include_start;
        self.include_end = include_end;
        self
    }

    /// Returns `true` if `time` falls inside the blackout.
    pub fn is_blackout(&self, time: NaiveTime) -> bool {
        let after_start = if self.include_start {
            time >= self.start
        } else {
            time > self.start
        };
        let before_end = if self.include_end {
            time <= self.end
        } else {
            time < self.end
        };
        after_start && before_end
    }

    /// Maps `now` to the ledger page a vote or cancellation applies to.
    ///
    /// - Before the window opens, the target is today (or the next ordering
    ///   day if today has no fulfilment).
    /// - After the window closes, the target is the next ordering day after
    ///   today, so a Friday evening vote lands on Monday.
    /// - Inside the window the action is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected::WindowClosed`] during the blackout and
    /// [`Rejected::NoOrderingDay`] if the calendar has no upcoming ordering
    /// day.
    pub fn resolve_target(
        &self,
        now: NaiveDateTime,
        calendar: &OrderingCalendar,
    ) -> Result<DateKey, Rejected> {
        let time = now.time();
        if self.is_blackout(time) {
            return Err(Rejected::WindowClosed);
        }

        let today = now.date();
        let target = if time <= self.start {
            calendar.on_or_after(today)
        } else {
            calendar.next_after(today)
        };

        target.map(DateKey::new).ok_or(Rejected::NoOrderingDay)
    }

    /// Human-readable ordering hours, e.g. `3:07 PM to 9:00 AM`.
    pub fn ordering_hours(&self) -> String {
        format!(
            "{} to {}",
            self.end.format("%-I:%M %p"),
            self.start.format("%-I:%M %p")
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn window() -> VotingWindow {
        VotingWindow::new(hms(9, 0, 0), hms(15, 7, 0))
    }

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn key(day: u32) -> DateKey {
        DateKey::new(NaiveDate::from_ymd_opt(2026, 10, day).unwrap())
    }

    #[test]
    fn test_before_window_targets_today() {
        let calendar = OrderingCalendar::default();
        assert_eq!(window().resolve_target(at(14, 8, 59, 59), &calendar), Ok(key(14)));
        assert_eq!(window().resolve_target(at(14, 0, 0, 0), &calendar), Ok(key(14)));
    }

    #[test]
    fn test_inside_window_is_rejected() {
        let calendar = OrderingCalendar::default();
        for (h, m, s) in [(9, 0, 0), (12, 30, 0), (15, 6, 59), (15, 7, 0)] {
            assert_eq!(
                window().resolve_target(at(14, h, m, s), &calendar),
                Err(Rejected::WindowClosed),
                "{h}:{m}:{s}"
            );
        }
    }

    #[test]
    fn test_after_window_targets_tomorrow() {
        let calendar = OrderingCalendar::default();
        assert_eq!(window().resolve_target(at(14, 15, 7, 1), &calendar), Ok(key(15)));
        assert_eq!(window().resolve_target(at(14, 23, 59, 59), &calendar), Ok(key(15)));
    }

    #[test]
    fn test_friday_evening_rolls_to_monday() {
        let calendar = OrderingCalendar::default();
        assert_eq!(window().resolve_target(at(16, 20, 0, 0), &calendar), Ok(key(19)));
    }

    #[test]
    fn test_friday_morning_stays_on_friday() {
        let calendar = OrderingCalendar::default();
        assert_eq!(window().resolve_target(at(16, 7, 0, 0), &calendar), Ok(key(16)));
    }

    #[test]
    fn test_weekend_morning_rolls_to_monday() {
        let calendar = OrderingCalendar::default();
        assert_eq!(window().resolve_target(at(17, 8, 0, 0), &calendar), Ok(key(19)));
        assert_eq!(window().resolve_target(at(18, 20, 0, 0), &calendar), Ok(key(19)));
    }

    #[test]
    fn test_every_day_calendar_targets_saturday() {
        let calendar = OrderingCalendar::every_day();
        assert_eq!(window().resolve_target(at(16, 20, 0, 0), &calendar), Ok(key(17)));
    }

    #[test]
    fn test_exclusive_boundaries_move_edges_outside() {
        let calendar = OrderingCalendar::default();
        let open = window().with_boundaries(false, false);

        assert!(!open.is_blackout(hms(9, 0, 0)));
        assert!(!open.is_blackout(hms(15, 7, 0)));
        assert!(open.is_blackout(hms(9, 0, 1)));

        assert_eq!(open.resolve_target(at(14, 9, 0, 0), &calendar), Ok(key(14)));
        assert_eq!(open.resolve_target(at(14, 15, 7, 0), &calendar), Ok(key(15)));
    }

    #[test]
    fn test_half_open_window_matches_timer_semantics() {
        let half_open = window().with_boundaries(true, false);
        assert!(half_open.is_blackout(hms(9, 0, 0)));
        assert!(!half_open.is_blackout(hms(15, 7, 0)));
    }

    #[test]
    fn test_no_ordering_day_is_reported() {
        let calendar = OrderingCalendar {
            ordering_days: Vec::new(),
            closed_dates: Vec::new(),
        };
        assert_eq!(
            window().resolve_target(at(14, 20, 0, 0), &calendar),
            Err(Rejected::NoOrderingDay)
        );
    }

    #[test]
    fn test_ordering_hours_reads_end_to_start() {
        assert_eq!(window().ordering_hours(), "3:07 PM to 9:00 AM");
    }

    #[test]
    fn test_window_deserializes_with_default_inclusivity() {
        let parsed: VotingWindow = toml::from_str(
            r#"
start = "18:00:00"
end = "20:00:00"
"#,
        )
        .unwrap();
        assert_eq!(parsed.start, hms(18, 0, 0));
        assert!(parsed.include_start);
        assert!(parsed.include_end);
    }
}
