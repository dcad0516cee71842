//! Content, playlist, rotation and prayer-schedule records.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Shortest per-item dwell a content record may request, in seconds.
pub const MIN_DWELL_SECS: u64 = 5;
/// Longest per-item dwell a content record may request, in seconds.
pub const MAX_DWELL_SECS: u64 = 300;

/// A piece of display content as delivered by the content service.
///
/// Read-only from the display's point of view; records are built by
/// [`crate::validation`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Opaque identifier.
    pub id: String,
    /// Human title.
    pub title: String,
    /// Image URL or video reference. Empty for text-only announcements.
    #[serde(default)]
    pub media_ref: String,
    /// Sponsorship amount (MYR). Display-only; never affects order or dwell.
    #[serde(default)]
    pub sponsorship_amount: f64,
    /// Only active items are eligible for rotation.
    pub is_active: bool,
    /// Position in the carousel (ascending).
    pub display_order: i64,
    /// Per-item carousel duration, already clamped to
    /// [`MIN_DWELL_SECS`]..=[`MAX_DWELL_SECS`].
    #[serde(default)]
    pub dwell_secs: Option<u64>,
    /// First day the item may be shown.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day the item may be shown.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl ContentItem {
    /// Active item with no media, sponsorship, dwell override or schedule window.
    pub fn new(id: impl Into<String>, title: impl Into<String>, display_order: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            media_ref: String::new(),
            sponsorship_amount: 0.0,
            is_active: true,
            display_order,
            dwell_secs: None,
            start_date: None,
            end_date: None,
        }
    }

    /// The item's own dwell time, if it overrides the display default.
    pub fn dwell_override(&self) -> Option<Duration> {
        self.dwell_secs.map(Duration::from_secs)
    }

    /// True when `day` falls inside the item's schedule window (bounds inclusive).
    pub fn is_scheduled_on(&self, day: NaiveDate) -> bool {
        let started = self.start_date.map_or(true, |s| s <= day);
        let not_ended = self.end_date.map_or(true, |e| day <= e);
        started && not_ended
    }

    /// Badge shown next to sponsored content.
    pub fn sponsorship_tier(&self) -> Option<SponsorshipTier> {
        SponsorshipTier::from_amount(self.sponsorship_amount)
    }
}

/// Sponsorship badge tiers (thresholds in MYR).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SponsorshipTier {
    /// 50 and up.
    Bronze,
    /// 200 and up.
    Silver,
    /// 500 and up.
    Gold,
    /// 1000 and up.
    Platinum,
}

impl SponsorshipTier {
    /// Tier for an amount; `None` below the bronze threshold.
    pub fn from_amount(amount: f64) -> Option<Self> {
        match amount {
            a if a >= 1000.0 => Some(Self::Platinum),
            a if a >= 500.0 => Some(Self::Gold),
            a if a >= 200.0 => Some(Self::Silver),
            a if a >= 50.0 => Some(Self::Bronze),
            _ => None,
        }
    }
}

/// Ordered, deduplicated sequence of active content used for rotation.
///
/// Built wholesale from a fetch snapshot and never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Playlist {
    items: Vec<ContentItem>,
}

impl Playlist {
    /// Playlist with no items.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keeps active items, drops duplicate ids (first occurrence wins) and
    /// sorts by `display_order`, then `id`.
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ContentItem>,
    {
        let mut seen = HashSet::new();
        let mut items: Vec<ContentItem> = items
            .into_iter()
            .filter(|item| item.is_active)
            .filter(|item| {
                let first = seen.insert(item.id.clone());
                if !first {
                    tracing::debug!(id = %item.id, "dropping duplicate content id");
                }
                first
            })
            .collect();
        items.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.id.cmp(&b.id))
        });
        Self { items }
    }

    /// Like [`Playlist::from_items`], additionally dropping items whose
    /// schedule window excludes `day`.
    pub fn scheduled_on<I>(items: I, day: NaiveDate) -> Self
    where
        I: IntoIterator<Item = ContentItem>,
    {
        Self::from_items(items.into_iter().filter(|item| item.is_scheduled_on(day)))
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when there is nothing to rotate.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index`.
    pub fn get(&self, index: usize) -> Option<&ContentItem> {
        self.items.get(index)
    }

    /// Items in rotation order.
    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    /// Item ids in playlist order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id.as_str())
    }

    /// True when both playlists hold the same ids in the same order,
    /// regardless of other field changes.
    pub fn same_ids(&self, other: &Playlist) -> bool {
        self.ids().eq(other.ids())
    }

    /// True when an item with `id` is in the playlist.
    pub fn contains(&self, id: &str) -> bool {
        self.ids().any(|existing| existing == id)
    }
}

/// Rotation position, owned by [`crate::rotation::RotationEngine`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    /// Valid only for the playlist carrying `playlist_version`.
    pub current_index: usize,
    /// Bumped every time the engine's playlist identity changes.
    pub playlist_version: u64,
    /// Ticks are dropped while set.
    pub is_paused: bool,
}

/// Prayer times for one zone and day. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerSchedule {
    /// JAKIM zone code, e.g. `SGR01`.
    pub zone_id: String,
    /// Day the times apply to.
    pub date: NaiveDate,
    /// Prayer name (e.g. `subuh`, `zohor`) to local time of day.
    pub times: BTreeMap<String, NaiveTime>,
}

impl PrayerSchedule {
    /// Entries sorted by time of day, ties by name.
    pub fn chronological(&self) -> Vec<(&str, NaiveTime)> {
        let mut entries: Vec<(&str, NaiveTime)> = self
            .times
            .iter()
            .map(|(name, time)| (name.as_str(), *time))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

/// Lifecycle state of a display controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    /// Constructed, not yet mounted.
    Idle,
    /// Mounted, waiting for the first content fetch.
    Loading,
    /// Rotating a playlist (possibly empty).
    Displaying,
    /// The initial or a post-error content fetch failed.
    Error,
    /// Torn down; no further state changes.
    Unmounted,
}
