//! Playback control and progress synchronization
//!
//! [`PlaybackController`] owns at most one [`PlaybackSession`] at a time.
//! Playing a different track tears the current session down (pause, rewind,
//! clear its progress) before the next one is opened, so two sources never
//! play together.
//!
//! The controller doesn't know about the DOM. It talks to three seams:
//!
//! - [`AudioBackend`] opens sources and hands back an [`AudioHandle`]
//! - [`PlayerView`] receives every visible change (button label, progress
//!   width, time text)
//! - [`Scheduler`] runs the periodic refresh of the time display
//!
//! The browser binding lives in the `wasm-player` crate; tests use in-memory
//! implementations.
//!
//! ```text
//!            play(other)                play(same)
//!   Idle ──────────────► Playing ◄──────────────── Paused
//!    ▲                     │  │                       ▲
//!    │  stop / ended /     │  └───── on_paused ───────┘
//!    └──── error ──────────┘
//! ```

mod session;

pub use session::PlaybackSession;

use std::time::Duration;
use thiserror::Error;

/// Index of a track on the page.
pub type TrackId = usize;

/// Identifies one opened source. Notifications carry it so that late events
/// from a torn-down source are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

pub const PLAY_LABEL: &str = "Play Audio";
pub const PLAYING_LABEL: &str = "Playing...";
pub const STOP_LABEL: &str = "Stop Audio";
pub const ZERO_PROGRESS: &str = "0%";
pub const ZERO_TIME: &str = "0:00 / 0:00";
pub const DEFAULT_REFRESH: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("audio source '{source_path}' is unavailable: {reason}")]
    Unavailable { source_path: String, reason: String },
}

/// A playable audio source.
pub trait AudioHandle {
    fn play(&mut self);
    fn pause(&mut self);
    /// Current position in seconds.
    fn position(&self) -> f64;
    fn set_position(&mut self, seconds: f64);
    /// Total length in seconds; may be NaN until metadata has loaded.
    fn duration(&self) -> f64;
    fn set_volume(&mut self, level: f64);
}

/// Opens audio sources.
pub trait AudioBackend {
    type Handle: AudioHandle;

    /// Open `source`. Notifications about the new handle must carry `session`.
    fn open(&mut self, session: SessionId, source: &str) -> Result<Self::Handle, PlaybackError>;
}

/// Receives the visible state of each track's player controls.
pub trait PlayerView {
    fn set_button_label(&mut self, track: TrackId, label: &str);
    /// Width of the progress fill, e.g. `"42.50%"`.
    fn set_progress(&mut self, track: TrackId, width: &str);
    fn set_time_text(&mut self, track: TrackId, text: &str);
}

/// Periodic timer support.
pub trait Scheduler {
    type Timer;

    /// Start calling the controller's `tick` every `period`.
    fn start_interval(&mut self, period: Duration) -> Self::Timer;
    fn cancel(&mut self, timer: Self::Timer);
}

pub struct PlaybackController<B: AudioBackend, V: PlayerView, S: Scheduler> {
    backend: B,
    view: V,
    scheduler: S,
    session: Option<PlaybackSession<B::Handle>>,
    timer: Option<S::Timer>,
    refresh: Duration,
    next_session: u64,
}

impl<B: AudioBackend, V: PlayerView, S: Scheduler> PlaybackController<B, V, S> {
    pub fn new(backend: B, view: V, scheduler: S) -> Self {
        PlaybackController {
            backend,
            view,
            scheduler,
            session: None,
            timer: None,
            refresh: DEFAULT_REFRESH,
            next_session: 0,
        }
    }

    pub fn with_refresh_interval(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn state(&self) -> PlaybackState {
        match &self.session {
            None => PlaybackState::Idle,
            Some(s) if s.playing => PlaybackState::Playing,
            Some(_) => PlaybackState::Paused,
        }
    }

    pub fn active_track(&self) -> Option<TrackId> {
        self.session.as_ref().map(|s| s.track)
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Current position of the loaded source, if any.
    pub fn position(&self) -> Option<f64> {
        self.session.as_ref().map(|s| s.handle().position())
    }

    pub fn is_refreshing(&self) -> bool {
        self.timer.is_some()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Play `source` for `track`.
    ///
    /// Resumes if `source` is already loaded; otherwise tears down whatever is
    /// loaded and opens `source` at `volume`.
    pub fn play(&mut self, track: TrackId, source: &str, volume: f64) -> Result<(), PlaybackError> {
        self.restart_timer();

        if self.session.as_ref().is_some_and(|s| s.source != source) {
            self.release_session();
        }

        if self.session.is_none() {
            let id = SessionId(self.next_session);
            self.next_session += 1;

            let mut handle = match self.backend.open(id, source) {
                Ok(h) => h,
                Err(e) => {
                    log::warn!("Could not open {}: {}", source, e);
                    self.cancel_timer();
                    self.reset_track(track);
                    return Err(e);
                }
            };
            handle.set_volume(clamp_unit(volume));
            log::debug!("Opened {} as session {:?}", source, id);
            self.session = Some(PlaybackSession::new(id, track, source.to_string(), handle));
        }

        if let Some(session) = self.session.as_mut() {
            session.play();
            self.view.set_button_label(session.track, PLAYING_LABEL);
        }
        Ok(())
    }

    /// Stop whatever plays and reset `track`'s controls.
    pub fn stop(&mut self, track: TrackId) {
        self.release_session();
        self.cancel_timer();
        self.reset_track(track);
    }

    /// The source reached its end on its own.
    pub fn on_ended(&mut self, session: SessionId) {
        if self.active_session() != Some(session) {
            return;
        }
        if let Some(track) = self.release_session() {
            log::debug!("Track {} finished", track);
        }
        self.cancel_timer();
    }

    /// The source failed to load or play.
    pub fn on_error(&mut self, session: SessionId) {
        if self.active_session() != Some(session) {
            return;
        }
        if let Some(s) = self.session.as_ref() {
            log::warn!("Audio source {} failed", s.source);
        }
        self.release_session();
        self.cancel_timer();
    }

    /// The source paused without going through the controller.
    pub fn on_paused(&mut self, session: SessionId) {
        let Some(s) = self.session.as_mut() else {
            return;
        };
        if s.id != session || !s.playing {
            return;
        }
        s.playing = false;
        let track = s.track;
        self.view.set_button_label(track, PLAY_LABEL);
    }

    /// Position changed; refresh the progress fill.
    pub fn on_time_update(&mut self, session: SessionId) {
        let Some(s) = self.session.as_ref() else {
            return;
        };
        if s.id != session {
            return;
        }
        if let Some(duration) = s.duration() {
            let width = progress_width(s.handle().position(), duration);
            self.view.set_progress(s.track, &width);
        }
    }

    /// Timer tick; refresh the elapsed / total text.
    pub fn tick(&mut self) {
        if let Some(s) = self.session.as_ref() {
            let text = format!(
                "{} / {}",
                format_time(s.handle().position()),
                format_time(s.handle().duration())
            );
            self.view.set_time_text(s.track, &text);
        }
    }

    /// Jump to `fraction` (0..1) of the loaded source.
    pub fn seek(&mut self, fraction: f64) {
        let Some(s) = self.session.as_mut() else {
            return;
        };
        let Some(duration) = s.duration() else {
            return;
        };
        let fraction = if fraction.is_nan() { 0.0 } else { clamp_unit(fraction) };
        s.handle_mut().set_position(fraction * duration);
    }

    pub fn set_volume(&mut self, level: f64) {
        if let Some(s) = self.session.as_mut() {
            s.handle_mut().set_volume(clamp_unit(level));
        }
    }

    fn restart_timer(&mut self) {
        self.cancel_timer();
        self.timer = Some(self.scheduler.start_interval(self.refresh));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.scheduler.cancel(timer);
        }
    }

    /// Tear down the current session and reset its track's controls.
    fn release_session(&mut self) -> Option<TrackId> {
        let track = self.session.take()?.teardown();
        self.reset_track(track);
        Some(track)
    }

    fn reset_track(&mut self, track: TrackId) {
        self.view.set_progress(track, ZERO_PROGRESS);
        self.view.set_button_label(track, PLAY_LABEL);
        self.view.set_time_text(track, ZERO_TIME);
    }
}

/// `m:ss`, minutes unpadded. Non-finite or negative input reads as zero.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Progress fill for `position` of `duration`, two decimals.
pub fn progress_width(position: f64, duration: f64) -> String {
    if !(duration.is_finite() && duration > 0.0) || !position.is_finite() {
        return ZERO_PROGRESS.to_string();
    }
    let pct = (position / duration * 100.0).clamp(0.0, 100.0);
    format!("{:.2}%", pct)
}

fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    // ==========================================================================
    // TEST DOUBLES
    // ==========================================================================
    //
    // Every handle writes what happens to it into a shared event log, so tests
    // can check ordering across sessions (A paused and rewound before B plays).
    // ==========================================================================

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Open(String),
        Play(String),
        Pause(String),
        Seek(String, f64),
        Volume(String, f64),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    #[derive(Debug)]
    struct FakeAudio {
        source: String,
        position: f64,
        duration: f64,
        volume: f64,
        playing: Rc<RefCell<HashMap<String, bool>>>,
        log: Log,
    }

    impl AudioHandle for FakeAudio {
        fn play(&mut self) {
            self.playing.borrow_mut().insert(self.source.clone(), true);
            self.log.borrow_mut().push(Event::Play(self.source.clone()));
        }
        fn pause(&mut self) {
            self.playing.borrow_mut().insert(self.source.clone(), false);
            self.log.borrow_mut().push(Event::Pause(self.source.clone()));
        }
        fn position(&self) -> f64 {
            self.position
        }
        fn set_position(&mut self, seconds: f64) {
            self.position = seconds;
            self.log.borrow_mut().push(Event::Seek(self.source.clone(), seconds));
        }
        fn duration(&self) -> f64 {
            self.duration
        }
        fn set_volume(&mut self, level: f64) {
            self.volume = level;
            self.log.borrow_mut().push(Event::Volume(self.source.clone(), level));
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        log: Log,
        playing: Rc<RefCell<HashMap<String, bool>>>,
        durations: HashMap<String, f64>,
        broken: Vec<String>,
    }

    impl AudioBackend for FakeBackend {
        type Handle = FakeAudio;

        fn open(&mut self, _session: SessionId, source: &str) -> Result<FakeAudio, PlaybackError> {
            if self.broken.iter().any(|b| b == source) {
                return Err(PlaybackError::Unavailable {
                    source_path: source.to_string(),
                    reason: "404".to_string(),
                });
            }
            self.log.borrow_mut().push(Event::Open(source.to_string()));
            Ok(FakeAudio {
                source: source.to_string(),
                position: 0.0,
                duration: self.durations.get(source).copied().unwrap_or(f64::NAN),
                volume: 1.0,
                playing: self.playing.clone(),
                log: self.log.clone(),
            })
        }
    }

    impl FakeBackend {
        fn playing_count(&self) -> usize {
            self.playing.borrow().values().filter(|p| **p).count()
        }
    }

    #[derive(Default)]
    struct FakeView {
        labels: HashMap<TrackId, String>,
        progress: HashMap<TrackId, String>,
        times: HashMap<TrackId, String>,
    }

    impl PlayerView for FakeView {
        fn set_button_label(&mut self, track: TrackId, label: &str) {
            self.labels.insert(track, label.to_string());
        }
        fn set_progress(&mut self, track: TrackId, width: &str) {
            self.progress.insert(track, width.to_string());
        }
        fn set_time_text(&mut self, track: TrackId, text: &str) {
            self.times.insert(track, text.to_string());
        }
    }

    #[derive(Default)]
    struct FakeScheduler {
        next: u32,
        running: Vec<u32>,
        periods: Vec<Duration>,
    }

    impl Scheduler for FakeScheduler {
        type Timer = u32;

        fn start_interval(&mut self, period: Duration) -> u32 {
            self.next += 1;
            self.running.push(self.next);
            self.periods.push(period);
            self.next
        }
        fn cancel(&mut self, timer: u32) {
            self.running.retain(|t| *t != timer);
        }
    }

    type Controller = PlaybackController<FakeBackend, FakeView, FakeScheduler>;

    fn controller() -> Controller {
        let mut backend = FakeBackend::default();
        backend.durations.insert("audio/a.mp3".to_string(), 120.0);
        backend.durations.insert("audio/b.mp3".to_string(), 90.0);
        PlaybackController::new(backend, FakeView::default(), FakeScheduler::default())
    }

    fn set_position(c: &mut Controller, seconds: f64) {
        c.session.as_mut().unwrap().handle_mut().position = seconds;
    }

    // ==========================================================================
    // PLAY / SWITCH TESTS
    // ==========================================================================

    #[test]
    fn test_play_opens_and_labels() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 0.7).unwrap();

        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.active_track(), Some(0));
        assert_eq!(c.view().labels[&0], PLAYING_LABEL);
        let log = c.backend().log.borrow().clone();
        assert_eq!(
            log,
            vec![
                Event::Open("audio/a.mp3".into()),
                Event::Volume("audio/a.mp3".into(), 0.7),
                Event::Play("audio/a.mp3".into()),
            ]
        );
    }

    #[test]
    fn test_switch_tears_down_previous_first() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        set_position(&mut c, 30.0);
        c.play(1, "audio/b.mp3", 1.0).unwrap();

        let log = c.backend().log.borrow().clone();
        let pause_a = log.iter().position(|e| *e == Event::Pause("audio/a.mp3".into())).unwrap();
        let rewind_a = log
            .iter()
            .position(|e| *e == Event::Seek("audio/a.mp3".into(), 0.0))
            .unwrap();
        let open_b = log.iter().position(|e| *e == Event::Open("audio/b.mp3".into())).unwrap();
        let play_b = log.iter().position(|e| *e == Event::Play("audio/b.mp3".into())).unwrap();

        assert!(pause_a < open_b && rewind_a < open_b && open_b < play_b);
        assert_eq!(c.backend().playing_count(), 1);
        assert_eq!(c.active_track(), Some(1));

        // Track A's controls are back to their idle state
        assert_eq!(c.view().labels[&0], PLAY_LABEL);
        assert_eq!(c.view().progress[&0], ZERO_PROGRESS);
        assert_eq!(c.view().times[&0], ZERO_TIME);
        assert_eq!(c.view().labels[&1], PLAYING_LABEL);
    }

    #[test]
    fn test_never_two_playing_handles() {
        let mut c = controller();
        for (track, src) in [(0, "audio/a.mp3"), (1, "audio/b.mp3"), (0, "audio/a.mp3"), (1, "audio/b.mp3")] {
            c.play(track, src, 1.0).unwrap();
            assert_eq!(c.backend().playing_count(), 1);
        }
    }

    #[test]
    fn test_play_same_source_resumes() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        set_position(&mut c, 42.0);
        let session = c.active_session();

        c.play(0, "audio/a.mp3", 1.0).unwrap();
        assert_eq!(c.active_session(), session);
        assert_eq!(c.position(), Some(42.0));
        let opens = c
            .backend()
            .log
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Open(_)))
            .count();
        assert_eq!(opens, 1);
    }

    #[test]
    fn test_single_refresh_timer() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        c.play(1, "audio/b.mp3", 1.0).unwrap();

        assert_eq!(c.scheduler.running.len(), 1);
        assert!(c.scheduler.periods.iter().all(|p| *p == DEFAULT_REFRESH));
    }

    #[test]
    fn test_refresh_interval_is_configurable() {
        let mut c = controller().with_refresh_interval(Duration::from_millis(250));
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        assert_eq!(c.scheduler.periods, vec![Duration::from_millis(250)]);
    }

    #[test]
    fn test_unavailable_source_leaves_idle() {
        let mut c = controller();
        c.backend.broken.push("audio/missing.mp3".to_string());

        let err = c.play(2, "audio/missing.mp3", 1.0).unwrap_err();
        assert!(matches!(err, PlaybackError::Unavailable { .. }));
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(!c.is_refreshing());
        assert_eq!(c.view().labels[&2], PLAY_LABEL);
    }

    // ==========================================================================
    // STOP / END TESTS
    // ==========================================================================
    //
    // Stop always leaves the controls at "0%", "Play Audio", "0:00 / 0:00",
    // whatever the state before.
    // ==========================================================================

    fn assert_reset(c: &Controller, track: TrackId) {
        assert_eq!(c.view().progress[&track], "0%");
        assert_eq!(c.view().labels[&track], "Play Audio");
        assert_eq!(c.view().times[&track], "0:00 / 0:00");
    }

    #[test]
    fn test_stop_while_playing() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        set_position(&mut c, 50.0);
        c.on_time_update(c.active_session().unwrap());
        c.tick();

        c.stop(0);
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(!c.is_refreshing());
        assert_eq!(c.backend().playing_count(), 0);
        assert_reset(&c, 0);
    }

    #[test]
    fn test_stop_when_idle() {
        let mut c = controller();
        c.stop(3);
        assert_eq!(c.state(), PlaybackState::Idle);
        assert_reset(&c, 3);
    }

    #[test]
    fn test_stop_from_other_track_stops_the_playing_one() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        c.stop(1);

        assert_eq!(c.state(), PlaybackState::Idle);
        assert_reset(&c, 0);
        assert_reset(&c, 1);
    }

    #[test]
    fn test_natural_end() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        let session = c.active_session().unwrap();

        c.on_ended(session);
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(!c.is_refreshing());
        assert_reset(&c, 0);
    }

    #[test]
    fn test_stale_notifications_are_ignored() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        let old = c.active_session().unwrap();
        c.play(1, "audio/b.mp3", 1.0).unwrap();

        c.on_ended(old);
        c.on_error(old);
        c.on_paused(old);
        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.active_track(), Some(1));
    }

    #[test]
    fn test_error_notification_resets() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        c.on_error(c.active_session().unwrap());
        assert_eq!(c.state(), PlaybackState::Idle);
        assert_reset(&c, 0);
    }

    #[test]
    fn test_external_pause_then_resume() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        let session = c.active_session().unwrap();

        c.on_paused(session);
        assert_eq!(c.state(), PlaybackState::Paused);
        assert_eq!(c.view().labels[&0], PLAY_LABEL);

        c.play(0, "audio/a.mp3", 1.0).unwrap();
        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.active_session(), Some(session));
    }

    // ==========================================================================
    // SEEK / VOLUME / PROGRESS TESTS
    // ==========================================================================

    #[test]
    fn test_seek_half_of_120s() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        c.seek(0.5);
        assert_eq!(c.position(), Some(60.0));
    }

    #[test]
    fn test_seek_clamps_and_noops() {
        let mut c = controller();
        // Nothing loaded
        c.seek(0.5);
        assert_eq!(c.position(), None);

        c.play(0, "audio/a.mp3", 1.0).unwrap();
        c.seek(1.5);
        assert_eq!(c.position(), Some(120.0));
        c.seek(-0.2);
        assert_eq!(c.position(), Some(0.0));
    }

    #[test]
    fn test_seek_before_metadata_is_noop() {
        let mut c = controller();
        c.play(0, "audio/unknown.mp3", 1.0).unwrap();
        c.seek(0.5);
        assert_eq!(c.position(), Some(0.0));
    }

    #[test]
    fn test_volume_applies_only_when_loaded() {
        let mut c = controller();
        c.set_volume(0.3);
        assert!(c.backend().log.borrow().is_empty());

        c.play(0, "audio/a.mp3", 1.0).unwrap();
        c.set_volume(0.3);
        c.set_volume(4.0);
        let volume = c.session.as_ref().unwrap().handle().volume;
        assert_eq!(volume, 1.0);
        assert!(c
            .backend()
            .log
            .borrow()
            .contains(&Event::Volume("audio/a.mp3".into(), 0.3)));
    }

    #[test]
    fn test_progress_and_time_display() {
        let mut c = controller();
        c.play(0, "audio/a.mp3", 1.0).unwrap();
        set_position(&mut c, 45.0);

        c.on_time_update(c.active_session().unwrap());
        c.tick();
        assert_eq!(c.view().progress[&0], "37.50%");
        assert_eq!(c.view().times[&0], "0:45 / 2:00");
    }

    #[test]
    fn test_progress_waits_for_duration() {
        let mut c = controller();
        c.play(0, "audio/unknown.mp3", 1.0).unwrap();
        c.on_time_update(c.active_session().unwrap());
        c.tick();
        assert!(!c.view().progress.contains_key(&0));
        assert_eq!(c.view().times[&0], "0:00 / 0:00");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(9.99), "0:09");
        assert_eq!(format_time(75.9), "1:15");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[test]
    fn test_progress_width() {
        assert_eq!(progress_width(30.0, 120.0), "25.00%");
        assert_eq!(progress_width(1.0, 3.0), "33.33%");
        assert_eq!(progress_width(5.0, f64::NAN), "0%");
        assert_eq!(progress_width(200.0, 100.0), "100.00%");
    }
}
