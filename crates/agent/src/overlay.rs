use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use masjid_display_core::model::PrayerSchedule;
use masjid_display_core::prayer::{self, UpcomingPrayer};
use masjid_display_core::DisplayError;

use crate::repository::ContentRepository;

/// Prayer-time overlay for one zone.
///
/// Keeps the last good schedule. A failed refresh never clears it; the
/// overlay goes stale instead of blank.
#[derive(Debug, Clone)]
pub struct PrayerTimeOverlay {
    zone_id: String,
    adjustments: BTreeMap<String, i64>,
    schedule: Option<PrayerSchedule>,
    refreshed_at: Option<NaiveDateTime>,
    last_error: Option<DisplayError>,
}

impl PrayerTimeOverlay {
    pub fn new(zone_id: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            adjustments: BTreeMap::new(),
            schedule: None,
            refreshed_at: None,
            last_error: None,
        }
    }

    /// Per-prayer minute offsets applied to every schedule stored from now on.
    pub fn with_adjustments(mut self, adjustments: BTreeMap<String, i64>) -> Self {
        self.adjustments = adjustments;
        self
    }

    /// Fetch and store the zone's schedule.
    pub async fn refresh<R: ContentRepository>(
        &mut self,
        repo: &R,
        now: NaiveDateTime,
    ) -> Result<&PrayerSchedule, DisplayError> {
        let result = repo.fetch_prayer_schedule(&self.zone_id).await;
        self.apply(result, now)
    }

    /// Store the outcome of a fetch made elsewhere. On failure the previous
    /// schedule stays in place and the error is returned.
    pub fn apply(
        &mut self,
        result: Result<PrayerSchedule, DisplayError>,
        now: NaiveDateTime,
    ) -> Result<&PrayerSchedule, DisplayError> {
        match result {
            Ok(schedule) => {
                let schedule = if self.adjustments.is_empty() {
                    schedule
                } else {
                    prayer::apply_adjustments(&schedule, &self.adjustments)
                };
                self.refreshed_at = Some(now);
                self.last_error = None;
                Ok(&*self.schedule.insert(schedule))
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn schedule(&self) -> Option<&PrayerSchedule> {
        self.schedule.as_ref()
    }

    pub fn refreshed_at(&self) -> Option<NaiveDateTime> {
        self.refreshed_at
    }

    pub fn last_error(&self) -> Option<&DisplayError> {
        self.last_error.as_ref()
    }

    pub fn current_period(&self, now: NaiveTime) -> Option<&str> {
        prayer::current_period(self.schedule.as_ref()?, now)
    }

    pub fn next_prayer(&self, now: NaiveDateTime) -> Option<UpcomingPrayer> {
        prayer::next_prayer(self.schedule.as_ref()?, now)
    }

    /// True when a schedule is held but dated for another day.
    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.schedule
            .as_ref()
            .is_some_and(|schedule| prayer::is_stale(schedule, today))
    }

    /// Forget everything fetched; used on unmount.
    pub fn clear(&mut self) {
        self.schedule = None;
        self.refreshed_at = None;
        self.last_error = None;
    }
}
