//! Configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notifications::{PollerTiming, SequencerTiming};

pub const DEFAULT_USER_AGENT: &str = "STV-IPTV/0.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    // Remote resources; plain paths are read from disk
    #[serde(default = "default_notifications_url")]
    pub notifications_url: String,
    #[serde(default = "default_images_url")]
    pub images_url: String,
    #[serde(default = "default_videos_url")]
    pub videos_url: String,
    #[serde(default = "default_channels_url")]
    pub channels_url: String,
    // Toasts
    #[serde(default = "default_initial_delay")]
    pub toast_initial_delay_ms: u64,
    #[serde(default = "default_toast_duration")]
    pub toast_duration_ms: u64,
    #[serde(default = "default_toast_gap")]
    pub toast_gap_ms: u64,
    // Live polling, 0 disables
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_stagger")]
    pub poll_stagger_ms: u64,
    // Player
    #[serde(default)]
    pub external_player: String,
    #[serde(default = "default_buffer")]
    pub buffer_seconds: u32,
    #[serde(default = "default_true")]
    pub hw_accel: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    // Appearance
    #[serde(default = "default_true")]
    pub dark_mode: bool,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
}

fn default_notifications_url() -> String { "data/notifications.json".to_string() }
fn default_images_url() -> String { "data/images.json".to_string() }
fn default_videos_url() -> String { "data/videos.json".to_string() }
fn default_channels_url() -> String { "data/channels.json".to_string() }
fn default_initial_delay() -> u64 { 5000 }
fn default_toast_duration() -> u64 { 3000 }
fn default_toast_gap() -> u64 { 2000 }
fn default_poll_interval() -> u64 { 15000 }
fn default_poll_stagger() -> u64 { 300 }
fn default_buffer() -> u32 { 5 }
fn default_font_size() -> u32 { 12 }
fn default_true() -> bool { true }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            notifications_url: default_notifications_url(),
            images_url: default_images_url(),
            videos_url: default_videos_url(),
            channels_url: default_channels_url(),
            toast_initial_delay_ms: default_initial_delay(),
            toast_duration_ms: default_toast_duration(),
            toast_gap_ms: default_toast_gap(),
            poll_interval_ms: default_poll_interval(),
            poll_stagger_ms: default_poll_stagger(),
            external_player: String::new(),
            buffer_seconds: default_buffer(),
            hw_accel: true,
            user_agent: default_user_agent(),
            dark_mode: true,
            font_size: default_font_size(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("stv_iptv");
        fs::create_dir_all(&path).ok();
        path.push("config.json");
        path
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Missing or unreadable files give the defaults
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring corrupt config {}: {}", path.display(), e),
                }
            }
        }

        Self::default()
    }

    pub fn save(&self) {
        self.save_to(&Self::config_path());
    }

    pub fn save_to(&self, path: &Path) {
        if let Ok(content) = serde_json::to_string_pretty(self) {
            if let Err(e) = fs::write(path, content) {
                tracing::warn!("Failed to save config: {}", e);
            }
        }
    }

    pub fn sequencer_timing(&self) -> SequencerTiming {
        SequencerTiming {
            initial_delay: Duration::from_millis(self.toast_initial_delay_ms),
            display: Duration::from_millis(self.toast_duration_ms),
            gap: Duration::from_millis(self.toast_gap_ms),
        }
    }

    pub fn poller_timing(&self) -> PollerTiming {
        PollerTiming {
            interval: Duration::from_millis(self.poll_interval_ms),
            stagger: Duration::from_millis(self.poll_stagger_ms),
        }
    }

    pub fn effective_user_agent(&self) -> &str {
        let ua = self.user_agent.trim();
        if ua.is_empty() {
            DEFAULT_USER_AGENT
        } else {
            ua
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("stv_iptv_config_{}_{}.json", name, std::process::id()));
        path
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{"poll_interval_ms":0,"external_player":"mpv"}"#).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.poll_interval_ms, 0);
        assert_eq!(config.external_player, "mpv");
        assert_eq!(config.toast_duration_ms, 3000);
        assert!(config.poller_timing().interval.is_zero());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_or_corrupt_gives_defaults() {
        assert_eq!(AppConfig::load_from(&temp_path("missing")), AppConfig::default());

        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("save");
        let mut config = AppConfig::default();
        config.toast_gap_ms = 1234;
        config.dark_mode = false;
        config.save_to(&path);

        assert_eq!(AppConfig::load_from(&path), config);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_timings_and_user_agent() {
        let mut config = AppConfig::default();
        assert_eq!(config.sequencer_timing(), SequencerTiming::default());
        assert_eq!(config.poller_timing(), PollerTiming::default());

        config.user_agent = "  ".to_string();
        assert_eq!(config.effective_user_agent(), DEFAULT_USER_AGENT);
    }
}
