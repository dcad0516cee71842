//! Prayer-period lookups over a [`PrayerSchedule`].

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

use crate::model::PrayerSchedule;

/// The prayer whose window `now` falls in: the last prayer (in chronological
/// order) whose time is at or before `now`. `None` before the first prayer.
pub fn current_period(schedule: &PrayerSchedule, now: NaiveTime) -> Option<&str> {
    schedule
        .chronological()
        .into_iter()
        .take_while(|(_, at)| *at <= now)
        .last()
        .map(|(name, _)| name)
}

/// Next prayer after `now` with the time left until it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingPrayer {
    /// Lower-cased prayer name.
    pub name: String,
    /// When it starts.
    pub at: NaiveDateTime,
    /// Time left from the `now` it was computed for.
    pub remaining: Duration,
    /// True when today's last prayer has passed and this is tomorrow's first.
    pub tomorrow: bool,
}

/// The next prayer strictly after `now`, rolling over to the first prayer of
/// the following day once the last one has passed. Times are read against
/// `now`'s calendar day.
pub fn next_prayer(schedule: &PrayerSchedule, now: NaiveDateTime) -> Option<UpcomingPrayer> {
    let entries = schedule.chronological();
    let today = now.date();

    let (name, at, tomorrow) = match entries.iter().find(|(_, t)| *t > now.time()) {
        Some((name, t)) => (*name, today.and_time(*t), false),
        None => {
            let (name, t) = entries.first()?;
            (*name, today.succ_opt()?.and_time(*t), true)
        }
    };

    let remaining = (at - now).to_std().unwrap_or_default();
    Some(UpcomingPrayer {
        name: name.to_string(),
        at,
        remaining,
        tomorrow,
    })
}

/// Applies per-prayer minute offsets, wrapping within the day. Offsets for
/// prayers missing from the schedule are ignored.
pub fn apply_adjustments(
    schedule: &PrayerSchedule,
    adjustments: &BTreeMap<String, i64>,
) -> PrayerSchedule {
    let mut adjusted = schedule.clone();
    for (name, minutes) in adjustments {
        let Some(time) = adjusted.times.get_mut(&name.to_lowercase()) else {
            continue;
        };
        if let Some(delta) = TimeDelta::try_minutes(*minutes) {
            *time = time.overflowing_add_signed(delta).0;
        }
    }
    adjusted
}

/// A schedule fetched for another day than `today`.
pub fn is_stale(schedule: &PrayerSchedule, today: NaiveDate) -> bool {
    schedule.date != today
}
