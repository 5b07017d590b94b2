//! Player overlay state machine
//!
//! Owns the single media element and everything layered over it: the
//! resume prompt, the transport bar and its auto-hide, tap gestures and
//! the scrub preview. Rendering lives in [`super::window`]; this type only
//! holds state and is driven by explicit `Instant`s.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::capabilities::{CapabilityProbe, TransportControls};
use super::gesture::{GestureAction, TapGestures, SKIP_SECS};
use super::media::{MediaDescriptor, MediaElement, MediaKind, StreamClient, StreamClientFactory};
use super::resume::{format_time, ResumeStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Closed,
    Opening,
    Ready,
    Playing,
    Paused,
    Ended,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumePrompt {
    /// Formatted position, e.g. `0:42`
    pub at: String,
    pub t: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerTiming {
    pub controls_hide: Duration,
    pub play_lock: Duration,
}

impl Default for PlayerTiming {
    fn default() -> Self {
        Self {
            controls_hide: Duration::from_secs(3),
            play_lock: Duration::from_millis(400),
        }
    }
}

struct Session {
    descriptor: MediaDescriptor,
    kind: MediaKind,
    resume_key: String,
    controls: TransportControls,
    stream: Option<Box<dyn StreamClient>>,
    prompt: Option<ResumePrompt>,
    scrub_preview: Option<f64>,
    controls_visible: bool,
    hide_at: Option<Instant>,
    play_lock_until: Option<Instant>,
}

pub struct PlayerOverlay<E: MediaElement> {
    element: E,
    resume: ResumeStore,
    probe: Box<dyn CapabilityProbe>,
    streams: Box<dyn StreamClientFactory>,
    timing: PlayerTiming,
    state: PlayerState,
    session: Option<Session>,
    gestures: TapGestures,
    scroll_locked: bool,
}

impl<E: MediaElement> PlayerOverlay<E> {
    pub fn new(
        element: E,
        resume: ResumeStore,
        probe: Box<dyn CapabilityProbe>,
        streams: Box<dyn StreamClientFactory>,
        timing: PlayerTiming,
    ) -> Self {
        Self {
            element,
            resume,
            probe,
            streams,
            timing,
            state: PlayerState::Closed,
            session: None,
            gestures: TapGestures::new(),
            scroll_locked: false,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn element_mut(&mut self) -> &mut E {
        &mut self.element
    }

    pub fn descriptor(&self) -> Option<&MediaDescriptor> {
        self.session.as_ref().map(|s| &s.descriptor)
    }

    pub fn kind(&self) -> Option<MediaKind> {
        self.session.as_ref().map(|s| s.kind)
    }

    pub fn controls(&self) -> TransportControls {
        self.session.as_ref().map(|s| s.controls).unwrap_or_default()
    }

    pub fn resume_prompt(&self) -> Option<&ResumePrompt> {
        self.session.as_ref().and_then(|s| s.prompt.as_ref())
    }

    pub fn controls_visible(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.controls_visible)
    }

    pub fn is_seeking(&self) -> bool {
        self.scrub_preview().is_some()
    }

    pub fn scrub_preview(&self) -> Option<f64> {
        self.session.as_ref().and_then(|s| s.scrub_preview)
    }

    /// Background scrolling is suspended while the overlay is open.
    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    /// Position shown in the transport bar: the scrub preview while
    /// dragging, else the element's time.
    pub fn display_time(&self) -> f64 {
        self.scrub_preview()
            .unwrap_or_else(|| self.element.current_time())
    }

    pub fn time_label(&self) -> String {
        format!(
            "{} / {}",
            format_time(self.display_time()),
            format_time(self.element.duration().unwrap_or(0.0))
        )
    }

    /// Progress in `[0, 1]`, zero while the duration is unknown.
    pub fn progress(&self) -> f64 {
        match self.element.duration() {
            Some(d) if d > 0.0 && d.is_finite() => (self.display_time() / d).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Earliest instant at which `tick` has something to do.
    pub fn next_due(&self) -> Option<Instant> {
        let hide = self.session.as_ref().and_then(|s| s.hide_at);
        match (hide, self.gestures.next_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Open a descriptor. An empty source is a no-op; any open session is
    /// torn down first.
    pub fn open(&mut self, descriptor: MediaDescriptor, now: Instant) -> bool {
        let src = descriptor.src.trim().to_string();
        if src.is_empty() {
            debug!("Ignoring open without a media source");
            return false;
        }
        if self.session.is_some() {
            self.close();
        }

        self.state = PlayerState::Opening;
        let kind = MediaKind::classify(&src);
        let controls = TransportControls::from_capabilities(&self.probe.probe());
        let resume_key = descriptor.resume_key();
        info!("Opening {:?} '{}'", kind, descriptor.title);

        let mut stream = None;
        match kind {
            MediaKind::Embed => {}
            MediaKind::Hls => match self.streams.create() {
                Some(mut client) => match client.attach(&mut self.element, &src) {
                    Ok(()) => stream = Some(client),
                    Err(e) => {
                        warn!("Stream client failed, using direct source: {}", e);
                        client.destroy();
                        self.element.set_source(&src);
                    }
                },
                None => self.element.set_source(&src),
            },
            MediaKind::File => self.element.set_source(&src),
        }

        let prompt = if kind == MediaKind::Embed {
            None
        } else {
            self.resume.load(&resume_key).map(|p| ResumePrompt {
                at: format_time(p.t),
                t: p.t,
            })
        };
        let has_prompt = prompt.is_some();

        self.session = Some(Session {
            descriptor,
            kind,
            resume_key,
            controls,
            stream,
            prompt,
            scrub_preview: None,
            controls_visible: true,
            hide_at: None,
            play_lock_until: None,
        });
        self.scroll_locked = true;
        self.state = PlayerState::Ready;

        if kind != MediaKind::Embed && !has_prompt {
            self.play_now();
        }
        self.show_controls(now);
        true
    }

    pub fn accept_resume(&mut self, now: Instant) {
        let Some(prompt) = self.session.as_mut().and_then(|s| s.prompt.take()) else {
            return;
        };
        debug!("Resuming at {}", prompt.at);
        self.element.seek(prompt.t);
        self.play_now();
        self.show_controls(now);
    }

    pub fn decline_resume(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.prompt.take().is_none() {
            return;
        }
        self.resume.clear(&session.resume_key);
        self.element.seek(0.0);
        self.play_now();
        self.show_controls(now);
    }

    /// Called on each position update from the element.
    pub fn on_time_update(&mut self, now: Instant) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.kind == MediaKind::Embed {
            return;
        }

        if self.element.has_ended() {
            if self.state != PlayerState::Ended {
                debug!("Playback ended");
                self.resume.clear(&session.resume_key);
                self.state = PlayerState::Ended;
                self.show_controls(now);
            }
            return;
        }

        if self.state == PlayerState::Playing {
            if self.element.is_paused() {
                self.state = PlayerState::Paused;
                self.show_controls(now);
                return;
            }
            self.resume
                .save_throttled(&session.resume_key, self.element.current_time());
        }
    }

    /// Advance timers: pending single taps and the controls auto-hide.
    pub fn tick(&mut self, now: Instant) {
        if let Some(action) = self.gestures.poll(now) {
            self.apply_gesture(action, now);
        }

        let playing = self.state == PlayerState::Playing;
        if let Some(session) = self.session.as_mut() {
            if session.hide_at.is_some_and(|at| now >= at) {
                session.hide_at = None;
                if playing && session.scrub_preview.is_none() {
                    session.controls_visible = false;
                }
            }
            if session.play_lock_until.is_some_and(|at| now >= at) {
                session.play_lock_until = None;
            }
        }
    }

    /// Pointer movement or touch start over the player.
    pub fn on_pointer_activity(&mut self, now: Instant) {
        self.show_controls(now);
    }

    /// A tap on the player surface. `on_control` is true when the tap
    /// landed on a transport control.
    pub fn on_tap(&mut self, x: f32, width: f32, on_control: bool, now: Instant) {
        if !self.has_transport() {
            return;
        }
        self.show_controls(now);
        if let Some(action) = self.gestures.on_tap(x, width, on_control, now) {
            self.apply_gesture(action, now);
        }
    }

    /// Play/pause from the transport button, ignored while the re-entrancy
    /// lock is held. Returns whether the toggle ran.
    pub fn toggle_play(&mut self, now: Instant) -> bool {
        if !self.has_transport() {
            return false;
        }
        let lock = self.timing.play_lock;
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.play_lock_until.is_some_and(|at| now < at) {
            return false;
        }
        session.play_lock_until = Some(now + lock);
        self.toggle(now);
        true
    }

    /// Relative seek, clamped to `[0, duration]`.
    pub fn skip(&mut self, delta: f64, now: Instant) {
        if !self.has_transport() {
            return;
        }
        let mut t = (self.element.current_time() + delta).max(0.0);
        if let Some(d) = self.element.duration().filter(|d| d.is_finite()) {
            t = t.min(d);
        }
        self.element.seek(t);
        self.show_controls(now);
    }

    pub fn skip_back(&mut self, now: Instant) {
        self.skip(-SKIP_SECS, now);
    }

    pub fn skip_forward(&mut self, now: Instant) {
        self.skip(SKIP_SECS, now);
    }

    /// Drag on the scrub bar: preview the time at `fraction` without
    /// seeking. Returns the previewed time.
    pub fn begin_scrub(&mut self, fraction: f64) -> Option<f64> {
        if !self.has_transport() {
            return None;
        }
        let duration = self.element.duration().filter(|d| d.is_finite() && *d > 0.0)?;
        let t = fraction.clamp(0.0, 1.0) * duration;
        if let Some(session) = self.session.as_mut() {
            session.scrub_preview = Some(t);
            session.controls_visible = true;
        }
        Some(t)
    }

    /// Release of the scrub bar: seek to the previewed time.
    pub fn commit_scrub(&mut self, now: Instant) {
        let Some(t) = self.session.as_mut().and_then(|s| s.scrub_preview.take()) else {
            return;
        };
        self.element.seek(t);
        self.show_controls(now);
    }

    pub fn toggle_mute(&mut self) {
        if self.has_transport() {
            let muted = self.element.is_muted();
            self.element.set_muted(!muted);
        }
    }

    /// Tear down the session: pause, destroy the stream client, clear the
    /// source and drop any unanswered resume prompt.
    pub fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        self.element.pause();
        if let Some(mut stream) = session.stream.take() {
            stream.destroy();
        }
        self.element.clear_source();
        self.gestures.reset();
        self.scroll_locked = false;
        self.state = PlayerState::Closed;
        info!("Closed '{}'", session.descriptor.title);
    }

    fn has_transport(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.kind != MediaKind::Embed && s.prompt.is_none())
    }

    fn toggle(&mut self, now: Instant) {
        if self.element.is_paused() || self.element.has_ended() {
            self.play_now();
        } else {
            self.element.pause();
            self.state = PlayerState::Paused;
        }
        self.show_controls(now);
    }

    fn apply_gesture(&mut self, action: GestureAction, now: Instant) {
        if !self.has_transport() {
            return;
        }
        match action {
            GestureAction::TogglePlay => {
                self.toggle_play(now);
            }
            GestureAction::Skip(delta) => self.skip(delta, now),
        }
    }

    /// Failures are logged and leave the overlay paused.
    fn play_now(&mut self) {
        match self.element.play() {
            Ok(()) => self.state = PlayerState::Playing,
            Err(e) => {
                debug!("play() failed: {}", e);
                self.state = PlayerState::Paused;
            }
        }
    }

    fn show_controls(&mut self, now: Instant) {
        let hide = self.timing.controls_hide;
        if let Some(session) = self.session.as_mut() {
            session.controls_visible = true;
            session.hide_at = Some(now + hide);
        }
    }
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod tests;
