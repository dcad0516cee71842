//! Event loop that mounts a [`DisplayController`] and drives it.
//!
//! One task per mounted display. The task owns the controller, so every
//! mutation happens on that task and no locking is involved. Fetches run as
//! child tasks (at most one per resource) whose results come back into the
//! loop; dropping their `JoinSet` on exit aborts anything still in flight.
//! Heartbeats go out the same way, one at a time.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use masjid_display_core::api::HeartbeatReport;
use masjid_display_core::model::{DisplayState, Playlist, PrayerSchedule};
use masjid_display_core::rotation::{LoadOutcome, Tick};
use masjid_display_core::{new_session_id, now_local, DisplayError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, info_span, warn, Instrument};
use ulid::Ulid;

use crate::controller::{
    BlackScreenChange, ContentApplied, DisplayController, DisplaySnapshot, FetchTicket,
    PrayerApplied, Resource,
};
use crate::repository::{ContentRepository, StatusReporter};
use crate::sink::{DisplaySink, RenderEvent};

/// Longest timer the loop arms; longer settings are clamped so deadline
/// arithmetic cannot overflow `Instant`.
const MAX_TIMER: Duration = Duration::from_secs(365 * 24 * 60 * 60);
const MIN_TIMER: Duration = Duration::from_millis(1);

/// Background cadences. The rotation cadence lives in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySettings {
    pub content_refresh: Duration,
    pub prayer_refresh: Duration,
    /// `None` disables heartbeats.
    pub heartbeat: Option<Duration>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            content_refresh: Duration::from_secs(300),
            prayer_refresh: Duration::from_secs(30 * 60),
            heartbeat: Some(Duration::from_secs(30)),
        }
    }
}

fn deadline(after: Duration) -> Instant {
    Instant::now() + after.min(MAX_TIMER)
}

/// Repeating timer whose first tick is one period out.
fn repeating(period: Duration) -> Interval {
    let period = period.clamp(MIN_TIMER, MAX_TIMER);
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Wall-clock source for prayer lookups.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        now_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Control messages for a mounted display.
#[derive(Debug)]
pub enum Command {
    Pause,
    Resume,
    RefreshContent,
    RefreshPrayer,
    Snapshot(oneshot::Sender<DisplaySnapshot>),
}

#[derive(Debug, Error)]
pub enum HandleError {
    #[error("display is no longer running")]
    Closed,
    #[error("display task failed: {0}")]
    Join(#[from] JoinError),
}

type ContentFetch = (FetchTicket, Result<Playlist, DisplayError>);
type PrayerFetch = (FetchTicket, Result<PrayerSchedule, DisplayError>);

#[derive(Default)]
struct InFlight {
    content: JoinSet<ContentFetch>,
    prayer: JoinSet<PrayerFetch>,
    heartbeat: JoinSet<Result<(), DisplayError>>,
}

/// A controller wired to its collaborators, ready to be mounted.
pub struct DisplayRuntime<R, S, C> {
    controller: DisplayController,
    repo: Arc<R>,
    sink: S,
    clock: C,
    settings: DisplaySettings,
    last_period: Option<Option<String>>,
    fetch_failures: u64,
}

impl<R, S, C> DisplayRuntime<R, S, C>
where
    R: ContentRepository + StatusReporter,
    S: DisplaySink,
    C: Clock,
{
    pub fn new(
        controller: DisplayController,
        repo: Arc<R>,
        sink: S,
        clock: C,
        settings: DisplaySettings,
    ) -> Self {
        Self {
            controller,
            repo,
            sink,
            clock,
            settings,
            last_period: None,
            fetch_failures: 0,
        }
    }

    /// Mount the display on a new task. Must be called within a tokio runtime.
    pub fn spawn(self) -> MountedDisplay {
        let session = new_session_id();
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = oneshot::channel();
        let span = info_span!("display", %session, zone = %self.controller.overlay().zone_id());
        let task = tokio::spawn(self.run(session, commands_rx, shutdown_rx).instrument(span));
        MountedDisplay {
            session,
            commands,
            shutdown: Some(shutdown),
            task,
        }
    }

    async fn run(
        mut self,
        session: Ulid,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> DisplayController {
        let mut in_flight = InFlight::default();
        let started = Instant::now();

        let before = self.controller.state();
        let tickets = self.controller.mount();
        self.emit_state(before);
        self.check_black_screen(self.clock.now());
        for ticket in tickets {
            self.start_fetch(ticket, &mut in_flight);
        }

        let mut content_timer = repeating(self.settings.content_refresh);
        let mut prayer_timer = repeating(self.settings.prayer_refresh);
        let mut heartbeat_timer = self.settings.heartbeat.map(repeating);

        let rotation = sleep_until(deadline(self.controller.engine().current_dwell()));
        tokio::pin!(rotation);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                Some(command) = commands.recv() => {
                    self.handle_command(command, &mut in_flight);
                }

                Some(joined) = in_flight.content.join_next(), if !in_flight.content.is_empty() => {
                    self.finish_content(joined, rotation.as_mut());
                }

                Some(joined) = in_flight.prayer.join_next(), if !in_flight.prayer.is_empty() => {
                    self.finish_prayer(joined);
                }

                Some(joined) = in_flight.heartbeat.join_next(),
                    if !in_flight.heartbeat.is_empty() =>
                {
                    match joined {
                        Ok(Ok(())) => debug!("heartbeat sent"),
                        Ok(Err(error)) => warn!(%error, "heartbeat failed"),
                        Err(error) => warn!(%error, "heartbeat task failed"),
                    }
                }

                () = &mut rotation, if self.controller.state() == DisplayState::Displaying => {
                    self.on_rotation_tick();
                    rotation.as_mut().reset(deadline(self.controller.engine().current_dwell()));
                }

                _ = content_timer.tick() => {
                    if let Some(ticket) = self.controller.request(Resource::Content) {
                        debug!("scheduled content refresh");
                        self.start_fetch(ticket, &mut in_flight);
                    }
                }

                _ = prayer_timer.tick() => {
                    if let Some(ticket) = self.controller.request(Resource::Prayer) {
                        debug!("scheduled prayer refresh");
                        self.start_fetch(ticket, &mut in_flight);
                    }
                }

                () = next_tick(&mut heartbeat_timer) => {
                    self.send_heartbeat(session, started, &mut in_flight);
                }
            }
        }

        // Abort before unmounting so nothing in flight outlives the mount.
        drop(in_flight);
        let before = self.controller.state();
        self.controller.unmount();
        self.emit_state(before);
        info!("display unmounted");
        self.controller
    }

    fn start_fetch(&self, ticket: FetchTicket, in_flight: &mut InFlight) {
        let repo = Arc::clone(&self.repo);
        match ticket.resource() {
            Resource::Content => {
                let today = self.clock.now().date();
                in_flight
                    .content
                    .spawn(async move { (ticket, repo.fetch_active_content(today).await) });
            }
            Resource::Prayer => {
                let zone = self.controller.overlay().zone_id().to_string();
                in_flight
                    .prayer
                    .spawn(async move { (ticket, repo.fetch_prayer_schedule(&zone).await) });
            }
        }
    }

    /// One heartbeat at a time; a tick that finds one still out is skipped.
    fn send_heartbeat(&self, session: Ulid, started: Instant, in_flight: &mut InFlight) {
        if !in_flight.heartbeat.is_empty() {
            debug!("previous heartbeat still in flight; skipping");
            return;
        }
        let report = self.heartbeat(session, started);
        let repo = Arc::clone(&self.repo);
        in_flight
            .heartbeat
            .spawn(async move { repo.report_status(report).await });
    }

    fn heartbeat(&self, session: Ulid, started: Instant) -> HeartbeatReport {
        let snapshot = self.controller.snapshot(self.clock.now());
        HeartbeatReport {
            is_online: true,
            session,
            state: snapshot.state,
            current_item: snapshot.current.map(|item| item.id),
            playlist_len: snapshot.playlist_len,
            playlist_version: snapshot.rotation.playlist_version,
            schedule_stale: snapshot.schedule_stale,
            black_screen: snapshot.black_screen,
            error_count: self.fetch_failures,
            last_error: snapshot.last_error,
            uptime_secs: started.elapsed().as_secs(),
        }
    }

    fn handle_command(&mut self, command: Command, in_flight: &mut InFlight) {
        match command {
            Command::Pause => {
                info!("rotation paused");
                self.controller.pause();
            }
            Command::Resume => {
                info!("rotation resumed");
                self.controller.resume();
            }
            Command::RefreshContent => {
                if let Some(ticket) = self.controller.request(Resource::Content) {
                    self.start_fetch(ticket, in_flight);
                }
            }
            Command::RefreshPrayer => {
                if let Some(ticket) = self.controller.request(Resource::Prayer) {
                    self.start_fetch(ticket, in_flight);
                }
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.controller.snapshot(self.clock.now()));
            }
        }
    }

    /// A panicked fetch task still settles its ticket, as a network failure.
    fn unwrap_joined<T>(
        &self,
        resource: Resource,
        joined: Result<(FetchTicket, Result<T, DisplayError>), JoinError>,
    ) -> Option<(FetchTicket, Result<T, DisplayError>)> {
        match joined {
            Ok(done) => Some(done),
            Err(e) => {
                let ticket = self.controller.pending(resource)?;
                Some((ticket, Err(DisplayError::Network(format!("fetch task failed: {e}")))))
            }
        }
    }

    fn finish_content(
        &mut self,
        joined: Result<ContentFetch, JoinError>,
        rotation: Pin<&mut Sleep>,
    ) {
        let Some((ticket, result)) = self.unwrap_joined(Resource::Content, joined) else {
            return;
        };
        match self.controller.apply_content(ticket, result) {
            ContentApplied::Discarded => {}
            ContentApplied::Loaded { outcome, previous } => {
                self.emit_state(previous);
                let uncovered = self.check_black_screen(self.clock.now());
                let restarted =
                    previous != DisplayState::Displaying || outcome == LoadOutcome::Reset;
                if !uncovered && (restarted || outcome == LoadOutcome::Preserved) {
                    self.show_current();
                }
                if restarted || uncovered {
                    rotation.reset(deadline(self.controller.engine().current_dwell()));
                }
            }
            ContentApplied::Failed { error, previous } => {
                self.emit_state(previous);
                self.fetch_failed(Resource::Content, &error);
            }
        }
    }

    fn fetch_failed(&mut self, resource: Resource, error: &DisplayError) {
        self.fetch_failures += 1;
        self.sink.render(RenderEvent::FetchFailed {
            resource,
            error: error.to_string(),
        });
    }

    fn finish_prayer(&mut self, joined: Result<PrayerFetch, JoinError>) {
        let Some((ticket, result)) = self.unwrap_joined(Resource::Prayer, joined) else {
            return;
        };
        let now = self.clock.now();
        match self.controller.apply_prayer(ticket, result, now) {
            PrayerApplied::Discarded => {}
            PrayerApplied::Updated => {
                let overlay = self.controller.overlay();
                if let Some(schedule) = overlay.schedule() {
                    self.sink.render(RenderEvent::PrayerUpdated {
                        schedule: schedule.clone(),
                        stale: overlay.is_stale(now.date()),
                    });
                }
                self.check_period(now);
            }
            PrayerApplied::Failed(error) => self.fetch_failed(Resource::Prayer, &error),
        }
    }

    fn on_rotation_tick(&mut self) {
        let now = self.clock.now();
        // The held item gets a full dwell once the screen is uncovered.
        if !self.check_black_screen(now) {
            match self.controller.tick() {
                Some(Tick::Advanced { .. }) => self.show_current(),
                Some(Tick::Repeated) => self.sink.render(RenderEvent::Ticked {
                    index: self.controller.engine().state().current_index,
                }),
                Some(Tick::Suppressed | Tick::Empty) | None => {}
            }
        }
        self.check_period(now);
    }

    /// Apply black-screen changes at `now`. True when the screen was just
    /// uncovered, in which case the current item has been shown again.
    fn check_black_screen(&mut self, now: NaiveDateTime) -> bool {
        match self.controller.update_black_screen(now) {
            Some(BlackScreenChange::Started(window)) => {
                self.sink.render(RenderEvent::BlackScreenStarted {
                    remaining_secs: window.remaining(now).map_or(0, |left| left.as_secs()),
                    message: window.message,
                    until: window.end,
                });
                false
            }
            Some(BlackScreenChange::Ended) => {
                self.sink.render(RenderEvent::BlackScreenEnded);
                if self.controller.state() == DisplayState::Displaying {
                    self.show_current();
                }
                true
            }
            None => false,
        }
    }

    fn show_current(&mut self) {
        if self.controller.black_screen().is_some() {
            return;
        }
        let engine = self.controller.engine();
        let event = match engine.current() {
            Some(item) => {
                let state = engine.state();
                RenderEvent::item_shown(item, state.current_index, state.playlist_version)
            }
            None => RenderEvent::ItemCleared,
        };
        self.sink.render(event);
    }

    /// Emit `PeriodChanged` when the prayer window differs from the last one shown.
    fn check_period(&mut self, now: NaiveDateTime) {
        let overlay = self.controller.overlay();
        if overlay.schedule().is_none() {
            return;
        }
        let current = overlay.current_period(now.time()).map(str::to_string);
        if self.last_period.as_ref() == Some(&current) {
            return;
        }
        let next = overlay.next_prayer(now);
        self.last_period = Some(current.clone());
        self.sink.render(RenderEvent::PeriodChanged { current, next });
    }

    fn emit_state(&mut self, before: DisplayState) {
        let after = self.controller.state();
        if before != after {
            self.sink.render(RenderEvent::StateChanged { from: before, to: after });
        }
    }
}

/// Handle to a running display. Dropping it unmounts the display without
/// waiting; [`MountedDisplay::unmount`] waits and hands back the controller.
#[derive(Debug)]
pub struct MountedDisplay {
    session: Ulid,
    commands: mpsc::UnboundedSender<Command>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<DisplayController>,
}

impl MountedDisplay {
    /// Per-mount id, also attached to the display's log span.
    pub fn session(&self) -> Ulid {
        self.session
    }

    pub fn send(&self, command: Command) -> Result<(), HandleError> {
        self.commands.send(command).map_err(|_| HandleError::Closed)
    }

    pub fn pause(&self) -> Result<(), HandleError> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), HandleError> {
        self.send(Command::Resume)
    }

    /// Request a content re-fetch now. Dropped if one is already in flight.
    pub fn refresh_content(&self) -> Result<(), HandleError> {
        self.send(Command::RefreshContent)
    }

    pub fn refresh_prayer(&self) -> Result<(), HandleError> {
        self.send(Command::RefreshPrayer)
    }

    pub async fn snapshot(&self) -> Result<DisplaySnapshot, HandleError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        rx.await.map_err(|_| HandleError::Closed)
    }

    /// Stop timers, abort in-flight fetches and wait for the loop to exit.
    pub async fn unmount(mut self) -> Result<DisplayController, HandleError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        Ok(self.task.await?)
    }
}
