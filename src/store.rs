//! Persistent key/value storage
//!
//! A small synchronous string store in the spirit of browser local storage.
//! Values are JSON strings; callers read them back through [`read_json`],
//! which treats a corrupt value as the empty default.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub const KEY_TAB: &str = "stv_selected_tab";
pub const KEY_NOTIFICATIONS: &str = "stv_notifications";
pub const KEY_REMOVED: &str = "stv_notif_removed";
pub const KEY_SHOWN: &str = "stv_notif_shown";
/// Older builds recorded toasted ids here; merged into the shown set on read.
pub const KEY_DISMISSED: &str = "stv_notif_dismissed";
pub const KEY_CHANNEL: &str = "canalSeleccionado";
pub const KEY_CHANNEL_WORLD: &str = "canalSeleccionado2";
pub const RESUME_PREFIX: &str = "stv_resume_";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Read a JSON value, falling back to `T::default()` when the key is
/// missing or holds something unparseable.
pub fn read_json<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    match store.get(key) {
        Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            debug!("Ignoring corrupt value under '{}': {}", key, e);
            T::default()
        }),
        None => T::default(),
    }
}

pub fn write_json<T, S>(store: &S, key: &str, value: &T)
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(e) => warn!("Failed to serialize '{}': {}", key, e),
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Store backed by a single JSON object on disk, written through on every
/// mutation so a crash never loses an acknowledged write.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("stv_iptv");
        fs::create_dir_all(&path).ok();
        path.push("storage.json");
        path
    }

    pub fn open(path: PathBuf) -> Self {
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|content| match serde_json::from_str(&content) {
                Ok(map) => Some(map),
                Err(e) => {
                    warn!("Storage file {:?} is corrupt, starting empty: {}", path, e);
                    None
                }
            })
            .unwrap_or_default();

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn flush(&self, entries: &BTreeMap<String, String>) {
        match serde_json::to_string_pretty(entries) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.path, content) {
                    warn!("Failed to write storage {:?}: {}", self.path, e);
                }
            }
            Err(e) => warn!("Failed to serialize storage: {}", e),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = lock(&self.entries);
        if entries.get(key).map(String::as_str) == Some(value) {
            return;
        }
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.flush(&entries);
        }
    }
}

/// In-memory store used by tests and as a last resort when nothing else is
/// available.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        lock(&self.entries).clone()
    }

    /// Number of `set`/`remove` calls that changed something.
    pub fn write_count(&self) -> usize {
        *lock(&self.writes)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = lock(&self.entries);
        if entries.get(key).map(String::as_str) != Some(value) {
            entries.insert(key.to_string(), value.to_string());
            *lock(&self.writes) += 1;
        }
    }

    fn remove(&self, key: &str) {
        if lock(&self.entries).remove(key).is_some() {
            *lock(&self.writes) += 1;
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
