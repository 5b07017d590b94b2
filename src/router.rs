//! Tab navigation with back/forward history, the persisted last tab and
//! the per-tab channel selection.

use std::sync::Arc;

use tracing::debug;

use crate::models::Tab;
use crate::store::{KeyValueStore, KEY_CHANNEL, KEY_CHANNEL_WORLD, KEY_TAB};

/// Minimum horizontal travel, in points, for a swipe to switch tabs.
pub const SWIPE_THRESHOLD: f32 = 50.0;

/// Back history keeps at most this many entries; the oldest drop off.
pub const HISTORY_LIMIT: usize = 50;

pub struct TabRouter {
    store: Arc<dyn KeyValueStore>,
    active: Tab,
    history: Vec<Tab>,
    cursor: usize,
}

impl TabRouter {
    /// Start on the persisted tab, or `Live` when none (or an unknown one)
    /// was saved.
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let active = store
            .get(KEY_TAB)
            .as_deref()
            .and_then(Tab::from_key)
            .unwrap_or(Tab::Live);
        debug!("Restored tab {:?}", active);
        Self {
            store,
            active,
            history: vec![active],
            cursor: 0,
        }
    }

    pub fn active(&self) -> Tab {
        self.active
    }

    pub fn navigate(&mut self, tab: Tab) {
        self.set_active(tab);
        if self.history.get(self.cursor) == Some(&tab) {
            return;
        }
        self.history.truncate(self.cursor + 1);
        self.history.push(tab);
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
        self.cursor = self.history.len() - 1;
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.history.len()
    }

    pub fn back(&mut self) -> Option<Tab> {
        if !self.can_go_back() {
            return None;
        }
        self.cursor -= 1;
        let tab = self.history[self.cursor];
        self.set_active(tab);
        Some(tab)
    }

    pub fn forward(&mut self) -> Option<Tab> {
        if !self.can_go_forward() {
            return None;
        }
        self.cursor += 1;
        let tab = self.history[self.cursor];
        self.set_active(tab);
        Some(tab)
    }

    /// A horizontal swipe: leftward goes to the next tab, rightward to the
    /// previous one. Mostly-vertical or short gestures are ignored.
    pub fn on_swipe(&mut self, dx: f32, dy: f32) -> Option<Tab> {
        if dx.abs() < SWIPE_THRESHOLD || dx.abs() < dy.abs() {
            return None;
        }
        let idx = self.active.index();
        let next = if dx < 0.0 {
            Tab::ALL.get(idx + 1).copied()
        } else {
            idx.checked_sub(1).map(|i| Tab::ALL[i])
        }?;
        self.navigate(next);
        Some(next)
    }

    /// Persisted channel for a channel tab
    pub fn selected_channel(&self, tab: Tab) -> Option<String> {
        channel_key(tab).and_then(|key| self.store.get(key))
    }

    pub fn select_channel(&mut self, tab: Tab, channel: &str) {
        if let Some(key) = channel_key(tab) {
            self.store.set(key, channel);
        }
    }

    fn set_active(&mut self, tab: Tab) {
        self.active = tab;
        self.store.set(KEY_TAB, tab.key());
    }
}

fn channel_key(tab: Tab) -> Option<&'static str> {
    match tab {
        Tab::Live => Some(KEY_CHANNEL),
        Tab::World => Some(KEY_CHANNEL_WORLD),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn router() -> (Arc<MemoryStore>, TabRouter) {
        let store = Arc::new(MemoryStore::new());
        let router = TabRouter::restore(store.clone());
        (store, router)
    }

    #[test]
    fn test_restore_defaults_and_persisted() {
        let (store, r) = router();
        assert_eq!(r.active(), Tab::Live);

        store.set(KEY_TAB, "images");
        assert_eq!(TabRouter::restore(store.clone()).active(), Tab::Movies);

        store.set(KEY_TAB, "nonsense");
        assert_eq!(TabRouter::restore(store).active(), Tab::Live);
    }

    #[test]
    fn test_navigate_persists_and_history() {
        let (store, mut r) = router();
        r.navigate(Tab::Movies);
        r.navigate(Tab::Videos);
        assert_eq!(store.get(KEY_TAB).as_deref(), Some("videos"));

        assert_eq!(r.back(), Some(Tab::Movies));
        assert_eq!(r.back(), Some(Tab::Live));
        assert_eq!(r.back(), None);
        assert_eq!(store.get(KEY_TAB).as_deref(), Some("envi"));

        assert_eq!(r.forward(), Some(Tab::Movies));
        // Navigating drops the forward entries
        r.navigate(Tab::Console);
        assert_eq!(r.forward(), None);
        assert_eq!(r.back(), Some(Tab::Movies));
    }

    #[test]
    fn test_history_is_bounded() {
        let (_, mut r) = router();
        for i in 0..500 {
            r.navigate(Tab::ALL[i % Tab::ALL.len()]);
        }
        assert_eq!(r.history.len(), HISTORY_LIMIT);
        assert_eq!(r.cursor, HISTORY_LIMIT - 1);

        let mut steps = 0;
        while r.back().is_some() {
            steps += 1;
        }
        assert_eq!(steps, HISTORY_LIMIT - 1);
        assert_eq!(r.forward(), Some(r.history[1]));
    }

    #[test]
    fn test_same_tab_is_not_pushed_twice() {
        let (_, mut r) = router();
        r.navigate(Tab::Live);
        assert!(!r.can_go_back());
    }

    #[test]
    fn test_swipe() {
        let (_, mut r) = router();
        assert_eq!(r.on_swipe(-49.0, 0.0), None);
        assert_eq!(r.on_swipe(-80.0, 90.0), None);
        assert_eq!(r.on_swipe(-80.0, 10.0), Some(Tab::World));
        assert_eq!(r.on_swipe(60.0, -60.0), Some(Tab::Live));
        // Already at the first tab
        assert_eq!(r.on_swipe(100.0, 0.0), None);

        r.navigate(Tab::Console);
        assert_eq!(r.on_swipe(-100.0, 0.0), None);
    }

    #[test]
    fn test_channel_selection() {
        let (_, mut r) = router();
        r.select_channel(Tab::Live, "espn2");
        r.select_channel(Tab::World, "history");
        r.select_channel(Tab::Movies, "ignored");
        assert_eq!(r.selected_channel(Tab::Live).as_deref(), Some("espn2"));
        assert_eq!(r.selected_channel(Tab::World).as_deref(), Some("history"));
        assert_eq!(r.selected_channel(Tab::Movies), None);
    }
}
