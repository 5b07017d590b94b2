//! Per-item playback positions

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::store::{read_json, write_json, KeyValueStore};

/// Seconds are only written when they moved more than this since the last
/// save. Also the minimum position worth offering a resume for.
pub const RESUME_THRESHOLD_SECS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResumePoint {
    /// Position in seconds
    #[serde(default)]
    pub t: f64,
    /// Wall-clock milliseconds of the save
    #[serde(default)]
    pub s: i64,
}

#[derive(Clone)]
pub struct ResumeStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ResumeStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// A point worth offering, or `None` (missing, corrupt or too early).
    pub fn load(&self, key: &str) -> Option<ResumePoint> {
        let point: ResumePoint = read_json(self.store.as_ref(), key);
        (point.t.is_finite() && point.t > RESUME_THRESHOLD_SECS).then_some(point)
    }

    /// Persist `t` unless the stored position is within the threshold.
    /// Returns whether a write happened.
    pub fn save_throttled(&self, key: &str, t: f64) -> bool {
        if !t.is_finite() {
            return false;
        }
        let saved: ResumePoint = read_json(self.store.as_ref(), key);
        if saved.t != 0.0 && (saved.t - t).abs() <= RESUME_THRESHOLD_SECS {
            return false;
        }
        let point = ResumePoint {
            t,
            s: self.clock.now().timestamp_millis(),
        };
        write_json(self.store.as_ref(), key, &point);
        true
    }

    pub fn clear(&self, key: &str) {
        self.store.remove(key);
    }
}

/// `M:SS`, or `H:MM:SS` from one hour up. Non-finite input is `0:00`.
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_string();
    }
    let total = secs.floor() as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, ResumeStore) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::at("2024-03-10T12:00:00Z"));
        (store.clone(), ResumeStore::new(store, clock))
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(42.5), "0:42");
        assert_eq!(format_time(61.0), "1:01");
        assert_eq!(format_time(3599.9), "59:59");
        assert_eq!(format_time(3600.0), "1:00:00");
        assert_eq!(format_time(3725.0), "1:02:05");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
    }

    #[test]
    fn test_save_is_throttled() {
        let (store, resume) = setup();
        assert!(resume.save_throttled("k", 10.0));
        assert!(!resume.save_throttled("k", 12.0));
        assert!(!resume.save_throttled("k", 13.0));
        assert!(resume.save_throttled("k", 13.5));
        assert_eq!(store.write_count(), 2);

        let raw = store.get("k").unwrap();
        let point: ResumePoint = serde_json::from_str(&raw).unwrap();
        assert_eq!(point.t, 13.5);
        assert_eq!(point.s, 1710072000000);
    }

    #[test]
    fn test_load_threshold_and_corruption() {
        let (store, resume) = setup();
        store.set("early", r#"{"t":2.9,"s":0}"#);
        store.set("bad", "{{{");
        store.set("good", r#"{"t":42.5,"s":1}"#);

        assert!(resume.load("early").is_none());
        assert!(resume.load("bad").is_none());
        assert!(resume.load("missing").is_none());
        assert_eq!(resume.load("good").map(|p| p.t), Some(42.5));

        resume.clear("good");
        assert!(resume.load("good").is_none());
    }
}
