#![forbid(unsafe_code)]

//! Headless masjid display: mounts a display against the HTTP APIs and logs
//! what it would render.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use masjid_display_agent::config::Config;
use masjid_display_agent::overlay::PrayerTimeOverlay;
use masjid_display_agent::repository::HttpContentRepository;
use masjid_display_agent::runtime::SystemClock;
use masjid_display_agent::sink::LogSink;
use masjid_display_agent::{DisplayController, DisplayRuntime};
use masjid_display_core::rotation::RotationEngine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "masjid-display")]
struct Args {
    /// TOML config file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Display identifier, substituted for `{display_id}` in the API URLs.
    /// Defaults to `main` when no config file is given.
    #[arg(long)]
    display_id: Option<String>,

    /// Content endpoint (URL template).
    #[arg(long)]
    content_url: Option<String>,

    /// Prayer-times endpoint (URL template).
    #[arg(long)]
    prayer_url: Option<String>,

    /// Heartbeat endpoint (URL template).
    #[arg(long)]
    heartbeat_url: Option<String>,

    /// JAKIM zone code, e.g. WLY01.
    #[arg(long)]
    zone: Option<String>,

    /// Default seconds per item.
    #[arg(long)]
    rotation_secs: Option<u64>,

    /// Seconds between background content refreshes.
    #[arg(long)]
    content_refresh_secs: Option<u64>,

    /// Seconds between prayer-time refreshes.
    #[arg(long)]
    prayer_refresh_secs: Option<u64>,

    /// Seconds between heartbeats; 0 disables them.
    #[arg(long)]
    heartbeat_secs: Option<u64>,

    /// Print the effective config as TOML and exit.
    #[arg(long)]
    print_config: bool,

    /// Log level (env-filter syntax).
    #[arg(long, default_value = "info")]
    log: String,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::default_for_display("main"),
        };
        if let Some(display_id) = self.display_id {
            cfg.display.display_id = display_id;
        }
        if let Some(url) = self.content_url {
            cfg.api.content_url = url;
        }
        if let Some(url) = self.prayer_url {
            cfg.api.prayer_url = url;
        }
        if let Some(url) = self.heartbeat_url {
            cfg.api.heartbeat_url = Some(url);
        }
        if let Some(zone) = self.zone {
            cfg.display.zone = zone;
        }
        if let Some(secs) = self.rotation_secs {
            cfg.timing.rotation_secs = secs;
        }
        if let Some(secs) = self.content_refresh_secs {
            cfg.timing.content_refresh_secs = secs;
        }
        if let Some(secs) = self.prayer_refresh_secs {
            cfg.timing.prayer_refresh_secs = secs;
        }
        if let Some(secs) = self.heartbeat_secs {
            cfg.timing.heartbeat_secs = secs;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let print_config = args.print_config;
    let cfg = args.into_config()?;
    if print_config {
        print!("{}", cfg.to_toml_string()?);
        return Ok(());
    }

    let mut repo = HttpContentRepository::new(cfg.content_url(), cfg.prayer_url());
    if let Some(url) = cfg.heartbeat_url() {
        repo = repo.with_heartbeat_url(url);
    }
    tracing::info!(
        display_id = %cfg.display.display_id,
        zone = %cfg.display.zone,
        content_url = repo.content_url(),
        prayer_url = repo.prayer_url(),
        heartbeat_url = ?repo.heartbeat_url(),
        black_screen_windows = cfg.black_screen.len(),
        "starting display"
    );

    let overlay = PrayerTimeOverlay::new(cfg.display.zone.clone())
        .with_adjustments(cfg.prayer.adjustments.clone());
    let controller = DisplayController::new(RotationEngine::new(cfg.rotation()), overlay)
        .with_black_screen(cfg.black_screen.clone());
    let runtime = DisplayRuntime::new(
        controller,
        Arc::new(repo),
        LogSink,
        SystemClock,
        cfg.settings(),
    );
    let mounted = runtime.spawn();
    tracing::info!(session = %mounted.session(), "display mounted");

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;

    let snapshot = mounted.snapshot().await?;
    tracing::info!(snapshot = %serde_json::to_string(&snapshot)?, "final state");
    mounted.unmount().await?;
    Ok(())
}
