use std::future::Future;

use chrono::NaiveDate;
use masjid_display_core::api::HeartbeatReport;
use masjid_display_core::model::{Playlist, PrayerSchedule};
use masjid_display_core::DisplayError;

mod http;
mod memory;

pub use http::HttpContentRepository;
pub use memory::InMemoryRepository;

/// Read side of the content and prayer-time services.
///
/// Both reads are idempotent and side-effect free. No retry happens here;
/// the caller decides when to ask again.
pub trait ContentRepository: Send + Sync + 'static {
    /// Active content scheduled on `today`, validated and ordered. An empty
    /// playlist is a valid answer and distinct from an error.
    fn fetch_active_content(
        &self,
        today: NaiveDate,
    ) -> impl Future<Output = Result<Playlist, DisplayError>> + Send;

    /// Prayer times for a zone.
    fn fetch_prayer_schedule(
        &self,
        zone_id: &str,
    ) -> impl Future<Output = Result<PrayerSchedule, DisplayError>> + Send;
}

/// Write side: the display's periodic heartbeat. Failures are reported to
/// the caller and never retried here.
pub trait StatusReporter: Send + Sync + 'static {
    /// Send one heartbeat.
    fn report_status(
        &self,
        report: HeartbeatReport,
    ) -> impl Future<Output = Result<(), DisplayError>> + Send;
}
