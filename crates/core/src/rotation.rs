//! Cyclic advancement over a [`Playlist`].
//!
//! The engine is a plain state holder: it never owns a timer. Whatever drives
//! the display calls [`RotationEngine::tick`] when the current item's dwell
//! time ([`RotationEngine::current_dwell`]) has elapsed.

use std::time::Duration;

use crate::model::{ContentItem, Playlist, RotationState};

/// Default dwell when neither the display config nor the item says otherwise.
pub const DEFAULT_DWELL: Duration = Duration::from_secs(10);

/// What a `load`/`resync` did to the rotation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Same content in the same order; index and version untouched.
    Unchanged,
    /// New playlist version, index back to 0.
    Reset,
    /// New playlist version, index kept because the item under it kept its id.
    Preserved,
}

/// What a timer tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Moved from one index to the next (wrapping at the end).
    Advanced {
        /// Index shown before the tick.
        from: usize,
        /// Index shown now.
        to: usize,
    },
    /// Single-item playlist: the index stays but the item is shown again.
    Repeated,
    /// Paused; the tick is dropped, not banked.
    Suppressed,
    /// Nothing to show.
    Empty,
}

/// Owns the playlist and the rotation state.
#[derive(Debug, Clone)]
pub struct RotationEngine {
    playlist: Playlist,
    state: RotationState,
    default_dwell: Duration,
}

impl Default for RotationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL)
    }
}

impl RotationEngine {
    /// Empty engine using `default_dwell` for items without their own.
    pub fn new(default_dwell: Duration) -> Self {
        Self {
            playlist: Playlist::empty(),
            state: RotationState::default(),
            default_dwell,
        }
    }

    /// Replace the playlist and reset the index to 0 under a new version.
    ///
    /// Loading a playlist identical in content and order is a no-op.
    pub fn load(&mut self, playlist: Playlist) -> LoadOutcome {
        if playlist == self.playlist {
            return LoadOutcome::Unchanged;
        }
        self.install(playlist, 0);
        LoadOutcome::Reset
    }

    /// Background-refresh variant of [`RotationEngine::load`]: keeps the index
    /// when the item at that position has the same id in both playlists.
    pub fn resync(&mut self, playlist: Playlist) -> LoadOutcome {
        if playlist == self.playlist {
            return LoadOutcome::Unchanged;
        }
        let index = self.state.current_index;
        let keep = match (self.playlist.get(index), playlist.get(index)) {
            (Some(old), Some(new)) => old.id == new.id,
            _ => false,
        };
        if keep {
            self.install(playlist, index);
            LoadOutcome::Preserved
        } else {
            self.install(playlist, 0);
            LoadOutcome::Reset
        }
    }

    fn install(&mut self, playlist: Playlist, index: usize) {
        debug_assert!((playlist.is_empty() && index == 0) || index < playlist.len());
        self.playlist = playlist;
        self.state.current_index = index;
        self.state.playlist_version += 1;
    }

    /// Item under the current index, `None` on an empty playlist.
    pub fn current(&self) -> Option<&ContentItem> {
        self.playlist.get(self.state.current_index)
    }

    /// Index + 1 modulo the playlist length. No-op on an empty playlist.
    pub fn advance(&mut self) {
        let len = self.playlist.len();
        if len == 0 {
            return;
        }
        self.state.current_index = (self.state.current_index + 1) % len;
    }

    /// Timer entry point.
    pub fn tick(&mut self) -> Tick {
        match self.playlist.len() {
            0 => Tick::Empty,
            _ if self.state.is_paused => Tick::Suppressed,
            1 => Tick::Repeated,
            _ => {
                let from = self.state.current_index;
                self.advance();
                Tick::Advanced {
                    from,
                    to: self.state.current_index,
                }
            }
        }
    }

    /// Stop advancing until [`RotationEngine::resume`].
    pub fn pause(&mut self) {
        self.state.is_paused = true;
    }

    /// Undo [`RotationEngine::pause`].
    pub fn resume(&mut self) {
        self.state.is_paused = false;
    }

    /// How long the current item stays up. Sponsorship never changes this.
    pub fn current_dwell(&self) -> Duration {
        self.current()
            .and_then(ContentItem::dwell_override)
            .unwrap_or(self.default_dwell)
    }

    /// Dwell for items without an override.
    pub fn default_dwell(&self) -> Duration {
        self.default_dwell
    }

    /// Playlist being rotated.
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Copy of the rotation position.
    pub fn state(&self) -> RotationState {
        self.state
    }

    /// Drop the playlist on teardown. The version keeps counting so a stale
    /// reader never mistakes the empty playlist for an older one.
    pub fn clear(&mut self) {
        if !self.playlist.is_empty() {
            self.install(Playlist::empty(), 0);
        }
    }
}
