//! Periodic re-fetch of the notification feed while the app is open.
//!
//! The poller only decides *when* to fetch; the shell runs the request on a
//! worker thread and hands the outcome back through [`LivePoller::on_fetch`].

use std::time::{Duration, Instant};

use tracing::debug;

use super::model::Notification;
use super::repository::NotificationRepository;
use super::sequencer::ToastSequencer;
use crate::feed::FeedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerTiming {
    /// Zero disables polling.
    pub interval: Duration,
    /// Delay between consecutive toasts for items found in one fetch.
    pub stagger: Duration,
}

impl Default for PollerTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(15000),
            stagger: Duration::from_millis(300),
        }
    }
}

pub struct LivePoller {
    repo: NotificationRepository,
    timing: PollerTiming,
    next_due: Option<Instant>,
    in_flight: bool,
}

impl LivePoller {
    pub fn new(repo: NotificationRepository, timing: PollerTiming) -> Self {
        Self {
            repo,
            timing,
            next_due: None,
            in_flight: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.timing.interval.is_zero()
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn start(&mut self, now: Instant) {
        if !self.is_enabled() || self.is_running() {
            return;
        }
        self.next_due = Some(now + self.timing.interval);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// True when a fetch should be started now. At most one fetch is in
    /// flight; the next deadline is set when this returns true.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(at) if now >= at && !self.in_flight => {
                self.in_flight = true;
                self.next_due = Some(now + self.timing.interval);
                true
            }
            _ => false,
        }
    }

    /// Merge a fetch outcome. New items are queued for display, staggered,
    /// and returned so the caller can refresh the badge and panel.
    pub fn on_fetch(
        &mut self,
        result: Result<Vec<Notification>, FeedError>,
        toasts: &mut ToastSequencer,
        now: Instant,
    ) -> Vec<Notification> {
        self.in_flight = false;
        let latest = match result {
            Ok(latest) => latest,
            Err(e) => {
                debug!("Notification poll failed: {}", e);
                return Vec::new();
            }
        };

        let fresh = self.repo.reconcile(latest);
        for (i, n) in fresh.iter().enumerate() {
            toasts.present(&n.id, self.timing.stagger * i as u32, now);
        }
        fresh
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
