//! Notification repository: the single source of truth for which
//! notifications are active, removed or already toasted.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::model::{parse_notifications, Notification};
use crate::clock::Clock;
use crate::feed::FeedError;
use crate::store::{
    read_json, write_json, KeyValueStore, KEY_DISMISSED, KEY_NOTIFICATIONS, KEY_REMOVED,
    KEY_SHOWN,
};

/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct NotificationRepository {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl NotificationRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn read_list(&self) -> Vec<Notification> {
        match self.store.get(KEY_NOTIFICATIONS) {
            Some(raw) => parse_notifications(&raw).unwrap_or_else(|e| {
                warn!("Stored notifications are corrupt, treating as empty: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    fn write_list(&self, list: &[Notification]) {
        write_json(self.store.as_ref(), KEY_NOTIFICATIONS, list);
    }

    fn read_set(&self, key: &str) -> BTreeSet<String> {
        read_json::<Vec<String>, _>(self.store.as_ref(), key)
            .into_iter()
            .collect()
    }

    fn write_set(&self, key: &str, set: &BTreeSet<String>) {
        let ids: Vec<&String> = set.iter().collect();
        write_json(self.store.as_ref(), key, &ids);
    }

    pub fn removed_ids(&self) -> BTreeSet<String> {
        self.read_set(KEY_REMOVED)
    }

    /// Shown ids, including the legacy dismissed set.
    pub fn shown_ids(&self) -> BTreeSet<String> {
        let mut shown = self.read_set(KEY_SHOWN);
        shown.extend(self.read_set(KEY_DISMISSED));
        shown
    }

    /// Apply the outcome of a network fetch. On success the fetched list
    /// (minus removed ids) replaces the local snapshot; on failure the last
    /// snapshot is kept. Either way the active view is returned.
    pub fn load(&self, fetched: Result<Vec<Notification>, FeedError>) -> Vec<Notification> {
        match fetched {
            Ok(latest) => {
                let removed = self.removed_ids();
                let mut seen = BTreeSet::new();
                let kept: Vec<Notification> = latest
                    .into_iter()
                    .filter(|n| !removed.contains(&n.id) && seen.insert(n.id.clone()))
                    .collect();
                info!("Fetched {} notifications", kept.len());
                self.write_list(&kept);
            }
            Err(e) => {
                warn!("Notification fetch failed, using local snapshot: {}", e);
            }
        }
        self.list_active()
    }

    /// Active notifications: not removed, not expired, de-duplicated by id.
    /// The pruned list is written back only when pruning changed it.
    pub fn list_active(&self) -> Vec<Notification> {
        let stored = self.read_list();
        let removed = self.removed_ids();
        let now = self.clock.now();

        let mut seen = BTreeSet::new();
        let active: Vec<Notification> = stored
            .iter()
            .filter(|n| !removed.contains(&n.id) && !n.is_expired(now))
            .filter(|n| seen.insert(n.id.clone()))
            .cloned()
            .collect();

        if active.len() != stored.len() {
            debug!("Pruned {} notifications", stored.len() - active.len());
            self.write_list(&active);
        }
        active
    }

    pub fn find(&self, id: &str) -> Option<Notification> {
        self.list_active().into_iter().find(|n| n.id == id)
    }

    pub fn is_removed(&self, id: &str) -> bool {
        self.removed_ids().contains(id)
    }

    pub fn is_shown(&self, id: &str) -> bool {
        self.shown_ids().contains(id)
    }

    pub fn mark_shown(&self, id: &str) {
        let mut shown = self.read_set(KEY_SHOWN);
        if shown.insert(id.to_string()) {
            self.write_set(KEY_SHOWN, &shown);
        }
    }

    /// Permanently delete a notification for this profile.
    pub fn remove(&self, id: &str) {
        let list: Vec<Notification> = self.read_list().into_iter().filter(|n| n.id != id).collect();
        self.write_list(&list);

        let mut removed = self.read_set(KEY_REMOVED);
        removed.insert(id.to_string());
        self.write_set(KEY_REMOVED, &removed);

        for key in [KEY_SHOWN, KEY_DISMISSED] {
            let mut set = self.read_set(key);
            if set.remove(id) {
                self.write_set(key, &set);
            }
        }
        info!("Removed notification {}", id);
    }

    /// Remove every active notification in one batch.
    pub fn remove_all(&self) {
        let active = self.list_active();
        let mut removed = self.read_set(KEY_REMOVED);
        removed.extend(active.iter().map(|n| n.id.clone()));
        self.write_set(KEY_REMOVED, &removed);
        self.write_list(&[]);
        self.store.remove(KEY_SHOWN);
        self.store.remove(KEY_DISMISSED);
        info!("Removed all {} notifications", active.len());
    }

    /// Merge a freshly fetched list into the local snapshot. Only ids that
    /// are neither removed nor already known are appended; those are
    /// returned for presentation.
    pub fn reconcile(&self, latest: Vec<Notification>) -> Vec<Notification> {
        let mut list = self.read_list();
        let removed = self.removed_ids();
        let now = self.clock.now();
        let mut known: BTreeSet<String> = list.iter().map(|n| n.id.clone()).collect();

        let fresh: Vec<Notification> = latest
            .into_iter()
            .filter(|n| !removed.contains(&n.id) && !n.is_expired(now))
            .filter(|n| known.insert(n.id.clone()))
            .collect();

        if !fresh.is_empty() {
            list.extend(fresh.iter().cloned());
            self.write_list(&list);
            info!("{} new notifications", fresh.len());
        }
        fresh
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
