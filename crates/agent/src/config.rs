use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use masjid_display_core::blackout::BlackScreenWindow;
use masjid_display_core::model::MAX_DWELL_SECS;
use serde::{Deserialize, Serialize};

use crate::runtime::DisplaySettings;

const DISPLAY_ID_PLACEHOLDER: &str = "{display_id}";
/// Longest accepted refresh or heartbeat interval.
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub display: DisplayConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub prayer: PrayerConfig,
    /// `[[black_screen]]` tables.
    #[serde(default)]
    pub black_screen: Vec<BlackScreenWindow>,
}

/// Endpoint templates; `{display_id}` is substituted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub content_url: String,
    pub prayer_url: String,
    /// Heartbeats are disabled when unset.
    #[serde(default)]
    pub heartbeat_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub display_id: String,
    /// JAKIM zone code.
    pub zone: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub rotation_secs: u64,
    pub content_refresh_secs: u64,
    pub prayer_refresh_secs: u64,
    /// 0 disables heartbeats.
    pub heartbeat_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rotation_secs: 10,
            content_refresh_secs: 300,
            prayer_refresh_secs: 1800,
            heartbeat_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerConfig {
    /// Minutes added to (or, when negative, taken from) a prayer's time.
    #[serde(default)]
    pub adjustments: BTreeMap<String, i64>,
}

impl Config {
    pub fn default_for_display(display_id: &str) -> Self {
        let api = "http://localhost:3001/api/displays/{display_id}";
        Self {
            api: ApiConfig {
                content_url: format!("{api}/content"),
                prayer_url: format!("{api}/prayer-times"),
                heartbeat_url: Some(format!("{api}/heartbeat")),
            },
            display: DisplayConfig {
                display_id: display_id.to_string(),
                zone: "WLY01".to_string(),
            },
            timing: TimingConfig::default(),
            prayer: PrayerConfig::default(),
            black_screen: Vec::new(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).with_context(|| "serialize toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.display.display_id.trim().is_empty() {
            bail!("display.display_id must not be empty");
        }
        if self.display.zone.trim().is_empty() {
            bail!("display.zone must not be empty");
        }
        if self.api.content_url.trim().is_empty() || self.api.prayer_url.trim().is_empty() {
            bail!("api.content_url and api.prayer_url must both be set");
        }
        let timing = &self.timing;
        for (name, secs, max) in [
            ("rotation_secs", timing.rotation_secs, MAX_DWELL_SECS),
            ("content_refresh_secs", timing.content_refresh_secs, MAX_INTERVAL_SECS),
            ("prayer_refresh_secs", timing.prayer_refresh_secs, MAX_INTERVAL_SECS),
        ] {
            if secs == 0 || secs > max {
                bail!("timing.{name} must be between 1 and {max}, got {secs}");
            }
        }
        if timing.heartbeat_secs > MAX_INTERVAL_SECS {
            bail!(
                "timing.heartbeat_secs must be at most {MAX_INTERVAL_SECS}, got {}",
                timing.heartbeat_secs
            );
        }
        for (i, window) in self.black_screen.iter().enumerate() {
            if window.start == window.end {
                bail!("black_screen[{i}]: start and end are both {}", window.start);
            }
        }
        Ok(())
    }

    pub fn content_url(&self) -> String {
        self.api
            .content_url
            .replace(DISPLAY_ID_PLACEHOLDER, &self.display.display_id)
    }

    pub fn prayer_url(&self) -> String {
        self.api
            .prayer_url
            .replace(DISPLAY_ID_PLACEHOLDER, &self.display.display_id)
    }

    pub fn heartbeat_url(&self) -> Option<String> {
        self.api
            .heartbeat_url
            .as_ref()
            .map(|url| url.replace(DISPLAY_ID_PLACEHOLDER, &self.display.display_id))
    }

    pub fn rotation(&self) -> Duration {
        Duration::from_secs(self.timing.rotation_secs)
    }

    pub fn settings(&self) -> DisplaySettings {
        DisplaySettings {
            content_refresh: Duration::from_secs(self.timing.content_refresh_secs),
            prayer_refresh: Duration::from_secs(self.timing.prayer_refresh_secs),
            heartbeat: self
                .heartbeat_url()
                .filter(|_| self.timing.heartbeat_secs > 0)
                .map(|_| Duration::from_secs(self.timing.heartbeat_secs)),
        }
    }
}
