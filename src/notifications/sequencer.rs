//! Toast rotation
//!
//! Walks the active notifications that have not been toasted yet, one at a
//! time: wait, show, gap, next. The same single display slot also carries
//! one-off toasts requested by the poller or by "open" on a notification
//! without a recognised action.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::debug;

use super::model::Notification;
use super::repository::NotificationRepository;
use crate::scheduler::{CancelToken, Scheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerTiming {
    pub initial_delay: Duration,
    pub display: Duration,
    pub gap: Duration,
}

impl Default for SequencerTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(5000),
            display: Duration::from_millis(3000),
            gap: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Waiting,
    Showing(String),
    Gap,
}

/// What the toast slot currently displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub serial: u64,
    pub notification_id: Option<String>,
    pub title: String,
    pub body: String,
    pub meta: String,
}

#[derive(Debug, Clone)]
enum ToastEvent {
    Begin,
    SequenceHide { serial: u64 },
    Advance,
    Present { id: String },
    SlotHide { serial: u64 },
}

pub struct ToastSequencer {
    repo: NotificationRepository,
    timing: SequencerTiming,
    state: SequencerState,
    queue: VecDeque<String>,
    scheduler: Scheduler<ToastEvent>,
    toast: Option<Toast>,
    next_serial: u64,
    sequence_hide: Option<CancelToken>,
    visible: bool,
}

impl ToastSequencer {
    pub fn new(repo: NotificationRepository, timing: SequencerTiming) -> Self {
        Self {
            repo,
            timing,
            state: SequencerState::Idle,
            queue: VecDeque::new(),
            scheduler: Scheduler::new(),
            toast: None,
            next_serial: 0,
            sequence_hide: None,
            visible: true,
        }
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state != SequencerState::Idle
    }

    pub fn visible_toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    /// Earliest pending timer, for scheduling the next repaint.
    pub fn next_due(&self) -> Option<Instant> {
        self.scheduler.next_due()
    }

    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            return;
        }
        let shown = self.repo.shown_ids();
        self.queue = self
            .repo
            .list_active()
            .into_iter()
            .filter(|n| !shown.contains(&n.id))
            .map(|n| n.id)
            .collect();

        if self.queue.is_empty() {
            debug!("Toast sequence: nothing pending");
            return;
        }
        debug!("Toast sequence: {} pending", self.queue.len());
        self.state = SequencerState::Waiting;
        self.scheduler
            .schedule_in(now, self.timing.initial_delay, ToastEvent::Begin);
    }

    pub fn stop(&mut self) {
        self.scheduler.cancel_all();
        self.queue.clear();
        self.sequence_hide = None;
        self.toast = None;
        self.state = SequencerState::Idle;
    }

    /// Window shown or hidden. Becoming visible always re-evaluates from
    /// scratch; it never resumes a half-shown item.
    pub fn set_visible(&mut self, visible: bool, now: Instant) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;
        if visible {
            self.start(now);
        } else {
            self.stop();
        }
    }

    /// Hide the current toast early. A sequence toast moves straight on to
    /// the gap.
    pub fn dismiss(&mut self, now: Instant) {
        let Some(toast) = self.toast.take() else {
            return;
        };
        if let SequencerState::Showing(id) = &self.state {
            if toast.notification_id.as_deref() == Some(id.as_str()) {
                if let Some(token) = self.sequence_hide.take() {
                    self.scheduler.cancel(token);
                }
                self.enter_gap(now);
            }
        }
    }

    /// Show one notification after `delay`, outside the rotation.
    pub fn present(&mut self, id: &str, delay: Duration, now: Instant) {
        self.scheduler.schedule_in(
            now,
            delay,
            ToastEvent::Present { id: id.to_string() },
        );
    }

    /// Show arbitrary text immediately in the toast slot.
    pub fn present_text(&mut self, title: &str, body: &str, now: Instant) {
        let serial = self.show(None, title, body, String::new());
        self.scheduler
            .schedule_in(now, self.timing.display, ToastEvent::SlotHide { serial });
    }

    /// Fire every timer due by `now`. Follow-up timers count from the
    /// deadline that fired, so a late tick replays the whole timeline.
    pub fn tick(&mut self, now: Instant) {
        while let Some((due, event)) = self.scheduler.pop_due(now) {
            self.handle(event, due);
        }
    }

    fn handle(&mut self, event: ToastEvent, at: Instant) {
        match event {
            ToastEvent::Begin | ToastEvent::Advance => self.advance(at),
            ToastEvent::SequenceHide { serial } => {
                self.sequence_hide = None;
                self.hide_if(serial);
                self.enter_gap(at);
            }
            ToastEvent::Present { id } => {
                if let Some(n) = self.displayable(&id) {
                    self.repo.mark_shown(&n.id);
                    let serial = self.show_notification(&n);
                    self.scheduler.schedule_in(
                        at,
                        self.timing.display,
                        ToastEvent::SlotHide { serial },
                    );
                }
            }
            ToastEvent::SlotHide { serial } => self.hide_if(serial),
        }
    }

    fn advance(&mut self, now: Instant) {
        while let Some(id) = self.queue.pop_front() {
            let Some(n) = self.displayable(&id) else {
                debug!("Toast sequence: skipping {}", id);
                continue;
            };
            self.repo.mark_shown(&n.id);
            let serial = self.show_notification(&n);
            self.state = SequencerState::Showing(n.id);
            self.sequence_hide = Some(self.scheduler.schedule_in(
                now,
                self.timing.display,
                ToastEvent::SequenceHide { serial },
            ));
            return;
        }
        self.state = SequencerState::Idle;
    }

    fn enter_gap(&mut self, now: Instant) {
        self.state = SequencerState::Gap;
        self.scheduler
            .schedule_in(now, self.timing.gap, ToastEvent::Advance);
    }

    /// Still active and not toasted since it was queued.
    fn displayable(&self, id: &str) -> Option<Notification> {
        if self.repo.is_shown(id) {
            return None;
        }
        self.repo.find(id)
    }

    fn show_notification(&mut self, n: &Notification) -> u64 {
        let local_now = self.repo.clock().now().with_timezone(&Local);
        let meta = n.toast_meta(&local_now);
        self.show(Some(n.id.clone()), &n.title, &n.body, meta)
    }

    fn show(&mut self, id: Option<String>, title: &str, body: &str, meta: String) -> u64 {
        self.next_serial += 1;
        let serial = self.next_serial;
        self.toast = Some(Toast {
            serial,
            notification_id: id,
            title: title.to_string(),
            body: body.to_string(),
            meta,
        });
        serial
    }

    /// Hide only the toast this timer put up.
    fn hide_if(&mut self, serial: u64) {
        if self.toast.as_ref().is_some_and(|t| t.serial == serial) {
            self.toast = None;
        }
    }
}

#[cfg(test)]
#[path = "sequencer_tests.rs"]
mod tests;
