use chrono::NaiveTime;
use masjid_display_core::model::{ContentItem, DisplayState, PrayerSchedule, SponsorshipTier};
use masjid_display_core::prayer::UpcomingPrayer;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::controller::Resource;

/// What the screen should do next. Emitted by the event loop in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RenderEvent {
    StateChanged {
        from: DisplayState,
        to: DisplayState,
    },
    /// A (possibly different) item is now current.
    ItemShown {
        item: ContentItem,
        index: usize,
        playlist_version: u64,
        tier: Option<SponsorshipTier>,
    },
    /// Single-item rotation fired; re-render in place.
    Ticked { index: usize },
    /// The playlist became empty.
    ItemCleared,
    PrayerUpdated {
        schedule: PrayerSchedule,
        stale: bool,
    },
    PeriodChanged {
        current: Option<String>,
        next: Option<UpcomingPrayer>,
    },
    /// A fetch failed. Surfaced for observability; the screen keeps what it has.
    FetchFailed { resource: Resource, error: String },
    /// Cover the screen until `until`. Rotation holds its position meanwhile.
    BlackScreenStarted {
        message: Option<String>,
        until: NaiveTime,
        remaining_secs: u64,
    },
    /// Uncover; an `ItemShown` for the held item follows when there is one.
    BlackScreenEnded,
}

impl RenderEvent {
    pub(crate) fn item_shown(item: &ContentItem, index: usize, playlist_version: u64) -> Self {
        Self::ItemShown {
            item: item.clone(),
            index,
            playlist_version,
            tier: item.sponsorship_tier(),
        }
    }
}

/// Receiver of render events. Called from the display's event loop, so it
/// must not block.
pub trait DisplaySink: Send + 'static {
    fn render(&mut self, event: RenderEvent);
}

impl DisplaySink for mpsc::UnboundedSender<RenderEvent> {
    fn render(&mut self, event: RenderEvent) {
        // Receiver gone means nobody is watching; keep running.
        let _ = self.send(event);
    }
}

/// Renders to the log. Used by the headless binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DisplaySink for LogSink {
    fn render(&mut self, event: RenderEvent) {
        match event {
            RenderEvent::StateChanged { from, to } => info!(?from, ?to, "display state"),
            RenderEvent::ItemShown {
                item,
                index,
                playlist_version,
                tier,
            } => info!(
                id = %item.id,
                title = %item.title,
                media = %item.media_ref,
                index,
                playlist_version,
                tier = ?tier,
                "showing"
            ),
            RenderEvent::Ticked { index } => info!(index, "showing (repeat)"),
            RenderEvent::ItemCleared => info!("no active content"),
            RenderEvent::PrayerUpdated { schedule, stale } => {
                let times: Vec<String> = schedule
                    .chronological()
                    .into_iter()
                    .map(|(name, at)| format!("{name} {}", at.format("%H:%M")))
                    .collect();
                info!(
                    zone = %schedule.zone_id,
                    date = %schedule.date,
                    stale,
                    times = ?times,
                    "prayer times"
                );
            }
            RenderEvent::PeriodChanged { current, next } => match next {
                Some(next) => info!(
                    current = ?current,
                    next = %next.name,
                    in_minutes = next.remaining.as_secs() / 60,
                    "prayer period"
                ),
                None => info!(current = ?current, "prayer period"),
            },
            RenderEvent::FetchFailed { resource, error } => {
                warn!(?resource, %error, "fetch failed")
            }
            RenderEvent::BlackScreenStarted {
                message,
                until,
                remaining_secs,
            } => info!(message = ?message, %until, remaining_secs, "black screen"),
            RenderEvent::BlackScreenEnded => info!("black screen over"),
        }
    }
}
