//! Tap gestures on the video surface
//!
//! A single tap toggles play/pause once it is clear no second tap follows;
//! a quick double tap skips backward on the left half and forward on the
//! right half.

use std::time::{Duration, Instant};

pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);
pub const SINGLE_TAP_DELAY: Duration = Duration::from_millis(250);
pub const SKIP_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    TogglePlay,
    Skip(f64),
}

#[derive(Debug, Default)]
pub struct TapGestures {
    last_tap: Option<Instant>,
    pending_single: Option<Instant>,
}

impl TapGestures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tap at horizontal position `x` within a surface of
    /// `width`. Taps on a control are ignored. Returns an action only for
    /// a completed double tap; single taps resolve through [`Self::poll`].
    pub fn on_tap(&mut self, x: f32, width: f32, on_control: bool, now: Instant) -> Option<GestureAction> {
        if on_control {
            return None;
        }

        if let Some(last) = self.last_tap {
            let dt = now.saturating_duration_since(last);
            if !dt.is_zero() && dt < DOUBLE_TAP_WINDOW {
                self.pending_single = None;
                // No triple-tap detection
                self.last_tap = None;
                let delta = if x < width / 2.0 { -SKIP_SECS } else { SKIP_SECS };
                return Some(GestureAction::Skip(delta));
            }
        }

        self.pending_single = Some(now + SINGLE_TAP_DELAY);
        self.last_tap = Some(now);
        None
    }

    /// Resolve a pending single tap whose delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<GestureAction> {
        match self.pending_single {
            Some(at) if now >= at => {
                self.pending_single = None;
                // A resolved single tap cannot become half of a double tap
                self.last_tap = None;
                Some(GestureAction::TogglePlay)
            }
            _ => None,
        }
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.pending_single
    }

    pub fn reset(&mut self) {
        self.last_tap = None;
        self.pending_single = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_single_tap_resolves_after_delay() {
        let t0 = Instant::now();
        let mut g = TapGestures::new();
        assert_eq!(g.on_tap(100.0, 400.0, false, t0), None);
        assert_eq!(g.poll(t0 + ms(249)), None);
        assert_eq!(g.poll(t0 + ms(250)), Some(GestureAction::TogglePlay));
        assert_eq!(g.poll(t0 + ms(500)), None);
    }

    #[test]
    fn test_double_tap_skips_by_half() {
        let t0 = Instant::now();
        let mut g = TapGestures::new();
        g.on_tap(100.0, 400.0, false, t0);
        assert_eq!(
            g.on_tap(100.0, 400.0, false, t0 + ms(200)),
            Some(GestureAction::Skip(-10.0))
        );
        // The pending single tap was cancelled
        assert_eq!(g.poll(t0 + ms(1000)), None);

        let t1 = t0 + ms(2000);
        g.on_tap(300.0, 400.0, false, t1);
        assert_eq!(
            g.on_tap(300.0, 400.0, false, t1 + ms(299)),
            Some(GestureAction::Skip(10.0))
        );
    }

    #[test]
    fn test_slow_second_tap_is_two_singles() {
        let t0 = Instant::now();
        let mut g = TapGestures::new();
        g.on_tap(100.0, 400.0, false, t0);
        assert_eq!(g.poll(t0 + ms(250)), Some(GestureAction::TogglePlay));
        assert_eq!(g.on_tap(100.0, 400.0, false, t0 + ms(300)), None);
        assert_eq!(g.poll(t0 + ms(550)), Some(GestureAction::TogglePlay));
    }

    #[test]
    fn test_tap_after_resolved_single_starts_over() {
        let t0 = Instant::now();
        let mut g = TapGestures::new();
        g.on_tap(300.0, 400.0, false, t0);
        assert_eq!(g.poll(t0 + ms(250)), Some(GestureAction::TogglePlay));
        // Inside the double-tap window, but the first tap already toggled
        assert_eq!(g.on_tap(300.0, 400.0, false, t0 + ms(280)), None);
        assert_eq!(g.poll(t0 + ms(530)), Some(GestureAction::TogglePlay));
    }

    #[test]
    fn test_taps_on_controls_are_ignored() {
        let t0 = Instant::now();
        let mut g = TapGestures::new();
        assert_eq!(g.on_tap(10.0, 400.0, true, t0), None);
        assert_eq!(g.poll(t0 + ms(1000)), None);
        assert!(g.next_due().is_none());
    }
}
