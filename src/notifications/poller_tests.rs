//! Tests for the live poller

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crate::clock::FixedClock;
    use crate::feed::FeedError;
    use crate::notifications::model::Notification;
    use crate::notifications::poller::{LivePoller, PollerTiming};
    use crate::notifications::repository::NotificationRepository;
    use crate::notifications::sequencer::{SequencerTiming, ToastSequencer};
    use crate::store::MemoryStore;

    fn setup(timing: PollerTiming) -> (NotificationRepository, LivePoller, ToastSequencer) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::at("2024-03-10T12:00:00Z"));
        let repo = NotificationRepository::new(store, clock);
        let poller = LivePoller::new(repo.clone(), timing);
        let seq = ToastSequencer::new(repo.clone(), SequencerTiming::default());
        (repo, poller, seq)
    }

    #[test]
    fn test_due_respects_interval_and_in_flight() {
        let (_, mut poller, mut seq) = setup(PollerTiming::default());
        let t0 = Instant::now();
        assert!(!poller.due(t0 + Duration::from_secs(60)));

        poller.start(t0);
        assert!(!poller.due(t0 + Duration::from_millis(14999)));
        assert!(poller.due(t0 + Duration::from_millis(15000)));
        // Previous fetch has not reported back yet
        assert!(!poller.due(t0 + Duration::from_secs(40)));

        poller.on_fetch(Err(FeedError::Status(500)), &mut seq, t0 + Duration::from_secs(40));
        assert!(poller.due(t0 + Duration::from_secs(40)));
    }

    #[test]
    fn test_zero_interval_disables_polling() {
        let (_, mut poller, _) = setup(PollerTiming {
            interval: Duration::ZERO,
            stagger: Duration::from_millis(300),
        });
        let t0 = Instant::now();
        poller.start(t0);
        assert!(!poller.is_running());
        assert!(!poller.due(t0 + Duration::from_secs(3600)));
    }

    #[test]
    fn test_stop() {
        let (_, mut poller, _) = setup(PollerTiming::default());
        let t0 = Instant::now();
        poller.start(t0);
        poller.stop();
        assert!(!poller.due(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_new_items_are_staggered() {
        let (repo, mut poller, mut seq) = setup(PollerTiming::default());
        repo.load(Ok(vec![Notification::new("old", "Old", "o")]));
        let t0 = Instant::now();

        let fresh = poller.on_fetch(
            Ok(vec![
                Notification::new("old", "Old", "o"),
                Notification::new("n1", "One", "1"),
                Notification::new("n2", "Two", "2"),
            ]),
            &mut seq,
            t0,
        );
        let ids: Vec<&str> = fresh.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2"]);

        seq.tick(t0);
        assert_eq!(seq.visible_toast().unwrap().notification_id.as_deref(), Some("n1"));
        seq.tick(t0 + Duration::from_millis(300));
        assert_eq!(seq.visible_toast().unwrap().notification_id.as_deref(), Some("n2"));
        assert!(repo.is_shown("n1") && repo.is_shown("n2"));
        assert!(!repo.is_shown("old"));
    }

    #[test]
    fn test_failure_changes_nothing() {
        let (repo, mut poller, mut seq) = setup(PollerTiming::default());
        repo.load(Ok(vec![Notification::new("a", "A", "a")]));
        let t0 = Instant::now();

        let fresh = poller.on_fetch(Err(FeedError::Request("offline".into())), &mut seq, t0);
        assert!(fresh.is_empty());
        assert_eq!(repo.list_active().len(), 1);
        assert!(seq.next_due().is_none());
    }

    #[test]
    fn test_removed_items_never_reappear() {
        let (repo, mut poller, mut seq) = setup(PollerTiming::default());
        repo.load(Ok(vec![Notification::new("a", "A", "a")]));
        repo.remove("a");

        let t0 = Instant::now();
        let fresh = poller.on_fetch(Ok(vec![Notification::new("a", "A", "a")]), &mut seq, t0);
        assert!(fresh.is_empty());
        assert!(repo.list_active().is_empty());
    }
}
