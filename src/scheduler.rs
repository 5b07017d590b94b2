//! Deadline queue with cancellation tokens
//!
//! Replaces chains of one-shot timers: callers schedule typed events, the UI
//! frame loop polls for the ones that are due, and a single `cancel_all`
//! guarantees nothing scheduled earlier can fire afterwards.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CancelToken(u64);

struct Timer<E> {
    id: u64,
    due: Instant,
    event: E,
}

pub struct Scheduler<E> {
    next_id: u64,
    // Sorted by (due, id) so ties fire in scheduling order
    timers: Vec<Timer<E>>,
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            timers: Vec::new(),
        }
    }

    pub fn schedule(&mut self, due: Instant, event: E) -> CancelToken {
        let id = self.next_id;
        self.next_id += 1;
        let pos = self
            .timers
            .partition_point(|t| (t.due, t.id) <= (due, id));
        self.timers.insert(pos, Timer { id, due, event });
        CancelToken(id)
    }

    pub fn schedule_in(&mut self, now: Instant, delay: Duration, event: E) -> CancelToken {
        self.schedule(now + delay, event)
    }

    /// Returns false when the timer already fired or was cancelled.
    pub fn cancel(&mut self, token: CancelToken) -> bool {
        match self.timers.iter().position(|t| t.id == token.0) {
            Some(pos) => {
                self.timers.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    /// Remove and return every event due at or before `now`, earliest
    /// first, each with the deadline it was scheduled for.
    pub fn poll(&mut self, now: Instant) -> Vec<(Instant, E)> {
        let due = self.timers.partition_point(|t| t.due <= now);
        self.timers.drain(..due).map(|t| (t.due, t.event)).collect()
    }

    /// Remove and return the earliest event due at or before `now`.
    /// Follow-ups scheduled from its deadline are seen by the next call.
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, E)> {
        if self.timers.first()?.due > now {
            return None;
        }
        let t = self.timers.remove(0);
        Some((t.due, t.event))
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.timers.first().map(|t| t.due)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_returns_due_events_in_order() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(t0 + Duration::from_millis(300), "c");
        s.schedule(t0 + Duration::from_millis(100), "a");
        s.schedule(t0 + Duration::from_millis(100), "b");

        assert!(s.poll(t0).is_empty());
        let a = t0 + Duration::from_millis(100);
        assert_eq!(s.poll(t0 + Duration::from_millis(150)), vec![(a, "a"), (a, "b")]);
        assert_eq!(s.next_due(), Some(t0 + Duration::from_millis(300)));
        assert_eq!(
            s.poll(t0 + Duration::from_secs(1)),
            vec![(t0 + Duration::from_millis(300), "c")]
        );
        assert!(s.is_empty());
    }

    #[test]
    fn test_cancelled_event_never_fires() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        let token = s.schedule_in(t0, Duration::from_millis(10), 1);
        s.schedule_in(t0, Duration::from_millis(20), 2);

        assert!(s.cancel(token));
        assert!(!s.cancel(token));
        assert_eq!(
            s.poll(t0 + Duration::from_secs(1)),
            vec![(t0 + Duration::from_millis(20), 2)]
        );
    }

    #[test]
    fn test_cancel_all() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.schedule_in(t0, Duration::ZERO, 1);
        s.schedule_in(t0, Duration::from_secs(5), 2);
        s.cancel_all();
        assert!(s.poll(t0 + Duration::from_secs(10)).is_empty());
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn test_pop_due_sees_follow_ups_from_deadline() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.schedule_in(t0, Duration::from_secs(5), 1);

        // A late poll replays the chain in deadline order
        let late = t0 + Duration::from_secs(60);
        let (due, ev) = s.pop_due(late).unwrap();
        assert_eq!((due, ev), (t0 + Duration::from_secs(5), 1));
        s.schedule_in(due, Duration::from_secs(3), 2);
        s.schedule_in(t0, Duration::from_secs(30), 3);

        assert_eq!(s.pop_due(late), Some((t0 + Duration::from_secs(8), 2)));
        assert_eq!(s.pop_due(late), Some((t0 + Duration::from_secs(30), 3)));
        assert_eq!(s.pop_due(late), None);
        assert_eq!(s.pop_due(t0), None);
    }
}
