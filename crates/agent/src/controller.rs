//! Display lifecycle state machine.
//!
//! The controller never performs I/O. It hands out [`FetchTicket`]s for the
//! fetches it wants, and the event loop feeds results back through
//! [`DisplayController::apply_content`] / [`DisplayController::apply_prayer`].
//! A ticket is only honoured while it is the pending one for its resource in
//! the current mount generation, which covers both coalescing and discarding
//! results that land after unmount.

use chrono::{NaiveDate, NaiveDateTime};
use masjid_display_core::blackout::{active_window, BlackScreenWindow};
use masjid_display_core::model::{
    ContentItem, DisplayState, Playlist, PrayerSchedule, RotationState,
};
use masjid_display_core::prayer::UpcomingPrayer;
use masjid_display_core::rotation::{LoadOutcome, RotationEngine, Tick};
use masjid_display_core::DisplayError;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::overlay::PrayerTimeOverlay;

/// Remote resource a fetch is for. At most one fetch per resource is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Content,
    Prayer,
}

/// Permission to run one fetch, tied to the mount generation it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    resource: Resource,
    generation: u64,
}

impl FetchTicket {
    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What applying a content fetch did.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentApplied {
    /// Late, foreign or duplicate result; nothing changed.
    Discarded,
    /// The playlist was handed to the rotation engine.
    Loaded {
        outcome: LoadOutcome,
        previous: DisplayState,
    },
    /// The fetch failed. `previous` is the state before the failure; the
    /// current state tells whether it surfaced as `Error` or was absorbed.
    Failed {
        error: DisplayError,
        previous: DisplayState,
    },
}

/// What applying a prayer fetch did.
#[derive(Debug, Clone, PartialEq)]
pub enum PrayerApplied {
    Discarded,
    Updated,
    /// The last known schedule (if any) is still in place.
    Failed(DisplayError),
}

/// A black-screen window opened or closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlackScreenChange {
    Started(BlackScreenWindow),
    Ended,
}

/// Point-in-time view of a display, for status queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    pub state: DisplayState,
    pub rotation: RotationState,
    pub playlist_len: usize,
    pub current: Option<ContentItem>,
    pub zone_id: String,
    pub prayer_date: Option<NaiveDate>,
    pub current_period: Option<String>,
    pub next_prayer: Option<UpcomingPrayer>,
    pub schedule_stale: bool,
    /// A black-screen window is covering the rotation.
    pub black_screen: bool,
    pub last_error: Option<String>,
}

/// Composes the rotation engine and the prayer overlay under one lifecycle.
#[derive(Debug, Clone)]
pub struct DisplayController {
    state: DisplayState,
    engine: RotationEngine,
    overlay: PrayerTimeOverlay,
    generation: u64,
    content_pending: Option<FetchTicket>,
    prayer_pending: Option<FetchTicket>,
    last_error: Option<DisplayError>,
    black_screen: Vec<BlackScreenWindow>,
    blanked_by: Option<BlackScreenWindow>,
}

impl DisplayController {
    pub fn new(engine: RotationEngine, overlay: PrayerTimeOverlay) -> Self {
        Self {
            state: DisplayState::Idle,
            engine,
            overlay,
            generation: 0,
            content_pending: None,
            prayer_pending: None,
            last_error: None,
            black_screen: Vec::new(),
            blanked_by: None,
        }
    }

    /// Windows during which the screen goes black and rotation stops.
    pub fn with_black_screen(mut self, windows: Vec<BlackScreenWindow>) -> Self {
        self.black_screen = windows;
        self
    }

    /// Idle → Loading. Returns the content and prayer tickets to fetch
    /// concurrently; empty when not idle.
    pub fn mount(&mut self) -> Vec<FetchTicket> {
        if self.state != DisplayState::Idle {
            debug!(state = ?self.state, "mount ignored");
            return Vec::new();
        }
        self.generation += 1;
        self.state = DisplayState::Loading;
        [Resource::Content, Resource::Prayer]
            .into_iter()
            .filter_map(|resource| self.request(resource))
            .collect()
    }

    /// Ask for a (re-)fetch. `None` when one is already in flight for the
    /// resource (the request is dropped, not queued) or the display is not
    /// mounted.
    pub fn request(&mut self, resource: Resource) -> Option<FetchTicket> {
        if !self.is_mounted() {
            return None;
        }
        if self.pending(resource).is_some() {
            debug!(?resource, "fetch already in flight; dropping request");
            return None;
        }
        let ticket = FetchTicket {
            resource,
            generation: self.generation,
        };
        *self.pending_slot(resource) = Some(ticket);
        Some(ticket)
    }

    /// The ticket currently in flight for `resource`.
    pub fn pending(&self, resource: Resource) -> Option<FetchTicket> {
        match resource {
            Resource::Content => self.content_pending,
            Resource::Prayer => self.prayer_pending,
        }
    }

    fn pending_slot(&mut self, resource: Resource) -> &mut Option<FetchTicket> {
        match resource {
            Resource::Content => &mut self.content_pending,
            Resource::Prayer => &mut self.prayer_pending,
        }
    }

    /// Consume `ticket` if it is the live pending ticket for its resource.
    fn settle(&mut self, ticket: FetchTicket) -> bool {
        if ticket.generation != self.generation || !self.is_mounted() {
            debug!(?ticket, generation = self.generation, "discarding stale fetch result");
            return false;
        }
        let slot = self.pending_slot(ticket.resource);
        if *slot != Some(ticket) {
            debug!(?ticket, "discarding unexpected fetch result");
            return false;
        }
        *slot = None;
        true
    }

    pub fn apply_content(
        &mut self,
        ticket: FetchTicket,
        result: Result<Playlist, DisplayError>,
    ) -> ContentApplied {
        if ticket.resource != Resource::Content || !self.settle(ticket) {
            return ContentApplied::Discarded;
        }
        let previous = self.state;
        match result {
            Ok(playlist) => {
                let outcome = match previous {
                    DisplayState::Displaying => self.engine.resync(playlist),
                    _ => self.engine.load(playlist),
                };
                self.state = DisplayState::Displaying;
                self.last_error = None;
                if previous != DisplayState::Displaying {
                    info!(items = self.engine.playlist().len(), "displaying content");
                } else if outcome != LoadOutcome::Unchanged {
                    info!(
                        items = self.engine.playlist().len(),
                        ?outcome,
                        version = self.engine.state().playlist_version,
                        "playlist refreshed"
                    );
                }
                ContentApplied::Loaded { outcome, previous }
            }
            Err(error) => {
                if previous == DisplayState::Displaying {
                    warn!(%error, "content refresh failed; keeping current playlist");
                } else {
                    warn!(%error, "content fetch failed");
                    self.state = DisplayState::Error;
                }
                self.last_error = Some(error.clone());
                ContentApplied::Failed { error, previous }
            }
        }
    }

    pub fn apply_prayer(
        &mut self,
        ticket: FetchTicket,
        result: Result<PrayerSchedule, DisplayError>,
        now: NaiveDateTime,
    ) -> PrayerApplied {
        if ticket.resource != Resource::Prayer || !self.settle(ticket) {
            return PrayerApplied::Discarded;
        }
        match self.overlay.apply(result, now) {
            Ok(schedule) => {
                info!(
                    zone = %schedule.zone_id,
                    date = %schedule.date,
                    prayers = schedule.times.len(),
                    "prayer schedule updated"
                );
                PrayerApplied::Updated
            }
            Err(error) => {
                let zone = self.overlay.zone_id();
                warn!(%error, zone, "prayer refresh failed; keeping last schedule");
                PrayerApplied::Failed(error)
            }
        }
    }

    /// Rotation timer entry point. `None` unless displaying; suppressed
    /// while a black-screen window is active.
    pub fn tick(&mut self) -> Option<Tick> {
        if self.state != DisplayState::Displaying {
            return None;
        }
        if self.blanked_by.is_some() {
            return Some(Tick::Suppressed);
        }
        Some(self.engine.tick())
    }

    /// Re-evaluate the black-screen windows at `now`. Returns the change, if
    /// any. Only a mounted display blanks.
    pub fn update_black_screen(&mut self, now: NaiveDateTime) -> Option<BlackScreenChange> {
        let active = if self.is_mounted() {
            active_window(&self.black_screen, now).cloned()
        } else {
            None
        };
        let was_blank = self.blanked_by.is_some();
        match active {
            Some(window) if !was_blank => {
                info!(until = %window.end, "black screen started");
                self.blanked_by = Some(window.clone());
                Some(BlackScreenChange::Started(window))
            }
            // Back-to-back windows: stay blank under the new one.
            Some(window) => {
                self.blanked_by = Some(window);
                None
            }
            None if was_blank => {
                info!("black screen ended");
                self.blanked_by = None;
                Some(BlackScreenChange::Ended)
            }
            None => None,
        }
    }

    /// The window currently blanking the screen.
    pub fn black_screen(&self) -> Option<&BlackScreenWindow> {
        self.blanked_by.as_ref()
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn resume(&mut self) {
        self.engine.resume();
    }

    /// * → Unmounted. Pending tickets die with the generation; fetched data
    /// is dropped. Idempotent.
    pub fn unmount(&mut self) {
        if self.state == DisplayState::Unmounted {
            return;
        }
        self.generation += 1;
        self.content_pending = None;
        self.prayer_pending = None;
        self.engine.clear();
        self.overlay.clear();
        self.blanked_by = None;
        self.state = DisplayState::Unmounted;
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn is_mounted(&self) -> bool {
        !matches!(self.state, DisplayState::Idle | DisplayState::Unmounted)
    }

    pub fn engine(&self) -> &RotationEngine {
        &self.engine
    }

    pub fn overlay(&self) -> &PrayerTimeOverlay {
        &self.overlay
    }

    pub fn current(&self) -> Option<&ContentItem> {
        self.engine.current()
    }

    /// Last content fetch failure, cleared by the next success.
    pub fn last_error(&self) -> Option<&DisplayError> {
        self.last_error.as_ref()
    }

    pub fn snapshot(&self, now: NaiveDateTime) -> DisplaySnapshot {
        DisplaySnapshot {
            state: self.state,
            rotation: self.engine.state(),
            playlist_len: self.engine.playlist().len(),
            current: self.engine.current().cloned(),
            zone_id: self.overlay.zone_id().to_string(),
            prayer_date: self.overlay.schedule().map(|s| s.date),
            current_period: self.overlay.current_period(now.time()).map(str::to_string),
            next_prayer: self.overlay.next_prayer(now),
            schedule_stale: self.overlay.is_stale(now.date()),
            black_screen: self.blanked_by.is_some(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }
}
