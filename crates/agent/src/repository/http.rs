use chrono::NaiveDate;
use masjid_display_core::api::{ContentListResponse, HeartbeatReport, PrayerTimesResponse};
use masjid_display_core::model::{Playlist, PrayerSchedule};
use masjid_display_core::validation::{validate_content_batch, validate_prayer_response, Decision};
use masjid_display_core::DisplayError;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use super::{ContentRepository, StatusReporter};

/// Repository backed by the display content API and the prayer-time API.
///
/// URLs are passed in fully resolved; nothing is read from the environment.
#[derive(Debug, Clone)]
pub struct HttpContentRepository {
    client: Client,
    content_url: String,
    prayer_url: String,
    heartbeat_url: Option<String>,
}

impl HttpContentRepository {
    pub fn new(content_url: impl Into<String>, prayer_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), content_url, prayer_url)
    }

    pub fn with_client(
        client: Client,
        content_url: impl Into<String>,
        prayer_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            content_url: content_url.into(),
            prayer_url: prayer_url.into(),
            heartbeat_url: None,
        }
    }

    /// Where heartbeats are POSTed. Without one, heartbeats are skipped.
    pub fn with_heartbeat_url(mut self, url: impl Into<String>) -> Self {
        self.heartbeat_url = Some(url.into());
        self
    }

    pub fn content_url(&self) -> &str {
        &self.content_url
    }

    pub fn prayer_url(&self) -> &str {
        &self.prayer_url
    }

    pub fn heartbeat_url(&self) -> Option<&str> {
        self.heartbeat_url.as_deref()
    }
}

impl ContentRepository for HttpContentRepository {
    async fn fetch_active_content(&self, today: NaiveDate) -> Result<Playlist, DisplayError> {
        let body = self
            .client
            .get(&self.content_url)
            .send()
            .await
            .map_err(DisplayError::network)?
            .error_for_status()
            .map_err(DisplayError::network)?
            .json::<ContentListResponse>()
            .await
            .map_err(DisplayError::network)?;

        let records = body.into_records();
        let batch = validate_content_batch(&records);
        for (index, outcome) in &batch.outcomes {
            match outcome.decision {
                Decision::Reject => {
                    warn!(index, violations = ?outcome.violations, "dropping content record")
                }
                Decision::Warn => {
                    debug!(index, warnings = ?outcome.warnings, "content record has warnings")
                }
                Decision::Accept => {}
            }
        }

        let playlist = Playlist::scheduled_on(batch.items, today);
        debug!(records = records.len(), active = playlist.len(), %today, "content fetched");
        Ok(playlist)
    }

    async fn fetch_prayer_schedule(&self, zone_id: &str) -> Result<PrayerSchedule, DisplayError> {
        let url = Url::parse_with_params(&self.prayer_url, &[("zone", zone_id)])
            .map_err(|e| DisplayError::network(format!("prayer url {}: {e}", self.prayer_url)))?;

        let body = self
            .client
            .get(url)
            .send()
            .await
            .map_err(DisplayError::network)?
            .error_for_status()
            .map_err(DisplayError::network)?
            .json::<PrayerTimesResponse>()
            .await
            .map_err(DisplayError::network)?;

        let (schedule, outcome) = validate_prayer_response(&body)?;
        if !outcome.is_clean() {
            let warnings = &outcome.warnings;
            warn!(zone = zone_id, ?warnings, "prayer schedule had unusable entries");
        }
        if schedule.zone_id != zone_id {
            warn!(
                requested = zone_id,
                returned = %schedule.zone_id,
                "prayer service answered for another zone"
            );
        }
        Ok(schedule)
    }
}

impl StatusReporter for HttpContentRepository {
    async fn report_status(&self, report: HeartbeatReport) -> Result<(), DisplayError> {
        let Some(url) = &self.heartbeat_url else {
            debug!("no heartbeat url; skipping heartbeat");
            return Ok(());
        };
        self.client
            .post(url)
            .json(&report)
            .send()
            .await
            .map_err(DisplayError::network)?
            .error_for_status()
            .map_err(DisplayError::network)?;
        Ok(())
    }
}
