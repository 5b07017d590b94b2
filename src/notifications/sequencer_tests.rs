//! Tests for the toast sequencer

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crate::clock::FixedClock;
    use crate::notifications::model::{parse_notifications, Notification};
    use crate::notifications::repository::NotificationRepository;
    use crate::notifications::sequencer::{SequencerState, SequencerTiming, ToastSequencer};
    use crate::store::MemoryStore;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup(items: Vec<Notification>) -> (NotificationRepository, ToastSequencer) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::at("2024-03-10T12:00:00Z"));
        let repo = NotificationRepository::new(store, clock);
        repo.load(Ok(items));
        let seq = ToastSequencer::new(repo.clone(), SequencerTiming::default());
        (repo, seq)
    }

    fn two() -> Vec<Notification> {
        vec![
            Notification::new("a", "Alpha", "first"),
            Notification::new("b", "Beta", "second"),
        ]
    }

    fn shown_id(seq: &ToastSequencer) -> Option<String> {
        seq.visible_toast().and_then(|t| t.notification_id.clone())
    }

    #[test]
    fn test_full_rotation_timeline() {
        let (repo, mut seq) = setup(two());
        let t0 = Instant::now();

        seq.start(t0);
        assert_eq!(seq.state(), &SequencerState::Waiting);

        seq.tick(t0 + ms(4999));
        assert!(seq.visible_toast().is_none());

        seq.tick(t0 + ms(5000));
        assert_eq!(seq.state(), &SequencerState::Showing("a".into()));
        assert_eq!(shown_id(&seq).as_deref(), Some("a"));
        assert!(repo.is_shown("a"));
        assert!(!repo.is_shown("b"));

        seq.tick(t0 + ms(8000));
        assert_eq!(seq.state(), &SequencerState::Gap);
        assert!(seq.visible_toast().is_none());

        seq.tick(t0 + ms(10000));
        assert_eq!(shown_id(&seq).as_deref(), Some("b"));

        seq.tick(t0 + ms(13000));
        assert!(seq.visible_toast().is_none());
        seq.tick(t0 + ms(15000));
        assert_eq!(seq.state(), &SequencerState::Idle);
        assert!(seq.next_due().is_none());
    }

    #[test]
    fn test_shown_items_are_not_repeated_across_runs() {
        let (_, mut seq) = setup(two());
        let t0 = Instant::now();
        seq.start(t0);
        seq.tick(t0 + Duration::from_secs(60));
        assert_eq!(seq.state(), &SequencerState::Idle);

        let t1 = t0 + Duration::from_secs(120);
        seq.start(t1);
        assert_eq!(seq.state(), &SequencerState::Idle);
        seq.tick(t1 + Duration::from_secs(60));
        assert!(seq.visible_toast().is_none());
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let (_, mut seq) = setup(two());
        let t0 = Instant::now();
        seq.start(t0);
        seq.start(t0 + ms(4000));
        // Still driven by the first start's timer
        seq.tick(t0 + ms(5000));
        assert_eq!(shown_id(&seq).as_deref(), Some("a"));
    }

    #[test]
    fn test_stop_cancels_everything() {
        let (repo, mut seq) = setup(two());
        let t0 = Instant::now();
        seq.start(t0);
        seq.tick(t0 + ms(5000));
        seq.present("b", ms(100), t0 + ms(5000));

        seq.stop();
        assert_eq!(seq.state(), &SequencerState::Idle);
        assert!(seq.visible_toast().is_none());

        seq.tick(t0 + Duration::from_secs(60));
        assert!(seq.visible_toast().is_none());
        assert!(!repo.is_shown("b"));
    }

    #[test]
    fn test_hidden_then_visible_restarts_fresh() {
        let (_, mut seq) = setup(two());
        let t0 = Instant::now();
        seq.start(t0);
        seq.tick(t0 + ms(5000));

        seq.set_visible(false, t0 + ms(6000));
        assert_eq!(seq.state(), &SequencerState::Idle);

        let t1 = t0 + ms(7000);
        seq.set_visible(true, t1);
        assert_eq!(seq.state(), &SequencerState::Waiting);
        seq.tick(t1 + ms(5000));
        // "a" was already shown before the window was hidden
        assert_eq!(shown_id(&seq).as_deref(), Some("b"));
    }

    #[test]
    fn test_items_removed_meanwhile_are_skipped() {
        let (repo, mut seq) = setup(two());
        let t0 = Instant::now();
        seq.start(t0);
        repo.remove("a");

        seq.tick(t0 + ms(5000));
        assert_eq!(shown_id(&seq).as_deref(), Some("b"));
    }

    #[test]
    fn test_dismiss_moves_to_gap() {
        let (_, mut seq) = setup(two());
        let t0 = Instant::now();
        seq.start(t0);
        seq.tick(t0 + ms(5000));

        seq.dismiss(t0 + ms(5500));
        assert!(seq.visible_toast().is_none());
        assert_eq!(seq.state(), &SequencerState::Gap);

        seq.tick(t0 + ms(7500));
        assert_eq!(shown_id(&seq).as_deref(), Some("b"));
    }

    #[test]
    fn test_sequence_hide_does_not_hide_foreign_toast() {
        let (_, mut seq) = setup(two());
        let t0 = Instant::now();
        seq.start(t0);
        seq.tick(t0 + ms(5000));

        seq.present_text("Info", "hello", t0 + ms(7000));
        seq.tick(t0 + ms(8000));
        let toast = seq.visible_toast().expect("text toast still visible");
        assert_eq!(toast.body, "hello");

        seq.tick(t0 + ms(10000));
        assert_eq!(shown_id(&seq).as_deref(), Some("b"));
    }

    #[test]
    fn test_present_marks_shown_and_auto_hides() {
        let (repo, mut seq) = setup(vec![Notification::new("n1", "New", "fresh")]);
        let t0 = Instant::now();

        seq.present("n1", ms(300), t0);
        seq.tick(t0 + ms(299));
        assert!(seq.visible_toast().is_none());

        seq.tick(t0 + ms(300));
        assert_eq!(shown_id(&seq).as_deref(), Some("n1"));
        assert!(repo.is_shown("n1"));
        assert_eq!(seq.state(), &SequencerState::Idle);

        seq.tick(t0 + ms(3300));
        assert!(seq.visible_toast().is_none());

        // Already shown: a second request is ignored
        seq.present("n1", ms(0), t0 + ms(4000));
        seq.tick(t0 + ms(4000));
        assert!(seq.visible_toast().is_none());
    }

    #[test]
    fn test_meta_label() {
        let json = r#"[
            {"id":"today","title":"T","body":"B","created":"2024-03-10T12:00:00Z","expire_days":0},
            {"id":"forever","title":"F","body":"B"}
        ]"#;
        let (_, mut seq) = setup(parse_notifications(json).unwrap());
        let t0 = Instant::now();
        seq.start(t0);

        seq.tick(t0 + ms(5000));
        assert_eq!(seq.visible_toast().unwrap().meta, "Today*");
        seq.tick(t0 + ms(10000));
        assert_eq!(shown_id(&seq).as_deref(), Some("forever"));
        assert_eq!(seq.visible_toast().unwrap().meta, "");
    }

    #[test]
    fn test_empty_queue_stays_idle() {
        let (_, mut seq) = setup(Vec::new());
        seq.start(Instant::now());
        assert_eq!(seq.state(), &SequencerState::Idle);
        assert!(seq.next_due().is_none());
    }
}
