//! Wire shapes exchanged with the display services.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

use crate::model::DisplayState;

/// Content list as returned by the content service.
///
/// Records stay untyped here; [`crate::validation::validate_content_batch`]
/// turns them into [`crate::model::ContentItem`]s one by one so a single bad
/// record cannot fail the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentListResponse {
    /// `{ "data": [...] }`, the display API envelope.
    Envelope {
        /// The records.
        data: Vec<Value>,
    },
    /// A bare JSON array.
    Bare(Vec<Value>),
}

impl ContentListResponse {
    /// Raw records, whichever shape the service used.
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Self::Envelope { data } => data,
            Self::Bare(records) => records,
        }
    }
}

/// Prayer-time service response for one zone and day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrayerTimesResponse {
    /// Zone the service answered for.
    pub zone: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Prayer name to `HH:MM` / `HH:MM:SS`. Values stay untyped so one bad
    /// entry can be dropped on its own.
    pub times: BTreeMap<String, Value>,
}

/// Status a display reports to `POST /api/displays/{id}/heartbeat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatReport {
    /// Always true; a display that can send is online.
    pub is_online: bool,
    /// Per-mount session id.
    pub session: Ulid,
    /// Controller lifecycle state.
    pub state: DisplayState,
    /// Id of the item on screen.
    pub current_item: Option<String>,
    /// Items in the active playlist.
    pub playlist_len: usize,
    /// Playlist version the rotation is on.
    pub playlist_version: u64,
    /// True while the prayer schedule is for another day.
    pub schedule_stale: bool,
    /// True while a black-screen window is active.
    pub black_screen: bool,
    /// Failed fetches since mount.
    pub error_count: u64,
    /// Most recent content fetch failure, if not yet recovered.
    pub last_error: Option<String>,
    /// Seconds since mount.
    pub uptime_secs: u64,
}
