//! Scheduled black-screen windows, e.g. during Friday prayers.
//!
//! A window blanks the screen between `start` and `end` on its days. When
//! `start` is later than `end` the window runs past midnight and its tail
//! belongs to the day it started on.

use std::time::Duration;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// One recurring black-screen window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackScreenWindow {
    /// Days the window starts on. Empty means every day.
    #[serde(default)]
    pub days: Vec<Weekday>,
    /// Local time the screen goes black (inclusive).
    pub start: NaiveTime,
    /// Local time the screen comes back (exclusive).
    pub end: NaiveTime,
    /// Text shown on the black screen.
    #[serde(default)]
    pub message: Option<String>,
}

impl BlackScreenWindow {
    /// Window on `days` from `start` to `end`, without a message.
    pub fn new(days: impl Into<Vec<Weekday>>, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            days: days.into(),
            start,
            end,
            message: None,
        }
    }

    fn starts_on(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&day)
    }

    fn overnight(&self) -> bool {
        self.start > self.end
    }

    /// True when `now` falls inside the window. A window whose start equals
    /// its end is never active.
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        let time = now.time();
        let day = now.weekday();
        if !self.overnight() {
            return self.starts_on(day) && self.start <= time && time < self.end;
        }
        let evening = self.starts_on(day) && time >= self.start;
        let morning_after = self.starts_on(day.pred()) && time < self.end;
        evening || morning_after
    }

    /// Time left until the screen comes back, `None` outside the window.
    pub fn remaining(&self, now: NaiveDateTime) -> Option<Duration> {
        if !self.contains(now) {
            return None;
        }
        let mut end = now.date().and_time(self.end);
        if end <= now {
            end = now.date().succ_opt()?.and_time(self.end);
        }
        (end - now).to_std().ok()
    }
}

/// First window in `windows` that covers `now`.
pub fn active_window(
    windows: &[BlackScreenWindow],
    now: NaiveDateTime,
) -> Option<&BlackScreenWindow> {
    windows.iter().find(|window| window.contains(now))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // 2025-03-07 is a Friday.
    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap().and_time(hm(h, m))
    }

    #[test]
    fn friday_window_is_half_open() {
        let jumaat = BlackScreenWindow::new([Weekday::Fri], hm(12, 45), hm(14, 0));
        assert!(!jumaat.contains(at(7, 12, 44)));
        assert!(jumaat.contains(at(7, 12, 45)));
        assert!(jumaat.contains(at(7, 13, 59)));
        assert!(!jumaat.contains(at(7, 14, 0)));
        assert!(!jumaat.contains(at(6, 13, 0)), "thursday");
        assert_eq!(jumaat.remaining(at(7, 13, 30)), Some(Duration::from_secs(30 * 60)));
        assert_eq!(jumaat.remaining(at(7, 15, 0)), None);
    }

    #[test]
    fn overnight_tail_belongs_to_start_day() {
        let night = BlackScreenWindow::new([Weekday::Fri], hm(23, 0), hm(6, 0));
        assert!(night.contains(at(7, 23, 30)));
        assert!(night.contains(at(8, 5, 59)), "saturday morning tail");
        assert!(!night.contains(at(8, 6, 0)));
        assert!(!night.contains(at(7, 5, 0)), "thursday night was not scheduled");
        assert_eq!(night.remaining(at(7, 23, 0)), Some(Duration::from_secs(7 * 3600)));
    }

    #[test]
    fn empty_days_means_daily() {
        let daily = BlackScreenWindow::new(Vec::new(), hm(1, 0), hm(4, 0));
        assert!(daily.contains(at(3, 2, 0)));
        assert!(daily.contains(at(9, 2, 0)));

        let never = BlackScreenWindow::new(Vec::new(), hm(1, 0), hm(1, 0));
        assert!(!never.contains(at(3, 1, 0)));
        assert!(active_window(&[never, daily], at(4, 3, 0)).is_some());
    }
}
