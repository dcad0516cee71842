use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use masjid_display_core::api::HeartbeatReport;
use masjid_display_core::model::{ContentItem, Playlist, PrayerSchedule};
use masjid_display_core::DisplayError;
use tokio::sync::watch;

use super::{ContentRepository, StatusReporter};

/// In-memory repository for tests and offline demos. Not durable.
///
/// Responses can be held back with [`InMemoryRepository::hold`] to simulate
/// a slow service; held fetches resolve once [`InMemoryRepository::release`]
/// is called.
pub struct InMemoryRepository {
    inner: Mutex<Inner>,
    gate: watch::Sender<bool>,
    content_fetches: AtomicUsize,
    prayer_fetches: AtomicUsize,
}

#[derive(Default)]
struct Inner {
    content: Vec<ContentItem>,
    content_failure: Option<String>,
    schedules: HashMap<String, PrayerSchedule>,
    prayer_failure: Option<String>,
    heartbeats: Vec<HeartbeatReport>,
    heartbeat_failure: Option<String>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            gate: watch::Sender::new(true),
            content_fetches: AtomicUsize::new(0),
            prayer_fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_content(items: Vec<ContentItem>) -> Self {
        let repo = Self::new();
        repo.set_content(items);
        repo
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the content snapshot and clear any injected failure.
    pub fn set_content(&self, items: Vec<ContentItem>) {
        let mut inner = self.lock();
        inner.content = items;
        inner.content_failure = None;
    }

    /// Make content fetches fail until the next `set_content`.
    pub fn fail_content(&self, reason: impl Into<String>) {
        self.lock().content_failure = Some(reason.into());
    }

    /// Store a schedule under its own zone and clear any injected failure.
    pub fn set_prayer_schedule(&self, schedule: PrayerSchedule) {
        let mut inner = self.lock();
        inner.schedules.insert(schedule.zone_id.clone(), schedule);
        inner.prayer_failure = None;
    }

    /// Make prayer fetches fail until the next `set_prayer_schedule`.
    pub fn fail_prayer(&self, reason: impl Into<String>) {
        self.lock().prayer_failure = Some(reason.into());
    }

    /// Make heartbeats fail (`Some`) or succeed again (`None`).
    pub fn fail_heartbeats(&self, reason: Option<String>) {
        self.lock().heartbeat_failure = reason;
    }

    /// Heartbeats received so far, oldest first. Failed ones are not kept.
    pub fn heartbeats(&self) -> Vec<HeartbeatReport> {
        self.lock().heartbeats.clone()
    }

    /// Block every fetch (new and pending) until [`InMemoryRepository::release`].
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Number of content fetches started so far, held ones included.
    pub fn content_fetches(&self) -> usize {
        self.content_fetches.load(Ordering::SeqCst)
    }

    pub fn prayer_fetches(&self) -> usize {
        self.prayer_fetches.load(Ordering::SeqCst)
    }

    async fn wait_for_gate(&self) {
        let mut open = self.gate.subscribe();
        // Err only if the sender is gone, which cannot happen while &self lives.
        let _ = open.wait_for(|open| *open).await;
    }
}

impl ContentRepository for InMemoryRepository {
    async fn fetch_active_content(&self, today: NaiveDate) -> Result<Playlist, DisplayError> {
        self.content_fetches.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;

        let inner = self.lock();
        if let Some(reason) = &inner.content_failure {
            return Err(DisplayError::Network(reason.clone()));
        }
        Ok(Playlist::scheduled_on(inner.content.clone(), today))
    }

    async fn fetch_prayer_schedule(&self, zone_id: &str) -> Result<PrayerSchedule, DisplayError> {
        self.prayer_fetches.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;

        let inner = self.lock();
        if let Some(reason) = &inner.prayer_failure {
            return Err(DisplayError::Network(reason.clone()));
        }
        inner
            .schedules
            .get(zone_id)
            .cloned()
            .ok_or_else(|| DisplayError::Network(format!("no prayer schedule for zone {zone_id}")))
    }
}

impl StatusReporter for InMemoryRepository {
    async fn report_status(&self, report: HeartbeatReport) -> Result<(), DisplayError> {
        let mut inner = self.lock();
        if let Some(reason) = &inner.heartbeat_failure {
            return Err(DisplayError::Network(reason.clone()));
        }
        inner.heartbeats.push(report);
        Ok(())
    }
}
