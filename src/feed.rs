//! Remote JSON resources
//!
//! Blocking fetches meant to run on a background thread. Plain paths (or
//! `file://` URLs) are read from disk so a bundled `data/` directory works
//! the same way as a hosted one.

use std::fs;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::notifications::{parse_notifications, Notification};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no URL configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("read failed: {0}")]
    Read(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct FeedClient {
    agent: ureq::Agent,
    user_agent: String,
}

impl FeedClient {
    pub fn new(user_agent: &str) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .timeout_connect(Some(Duration::from_secs(10)))
            .build()
            .new_agent();

        Self {
            agent,
            user_agent: user_agent.to_string(),
        }
    }

    pub fn get_text(&self, url: &str) -> Result<String, FeedError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FeedError::NotConfigured);
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            let path = url.strip_prefix("file://").unwrap_or(url);
            debug!("Reading local resource {}", path);
            return Ok(fs::read_to_string(path)?);
        }

        debug!("GET {}", url);
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .header("Accept", "application/json")
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => FeedError::Status(code),
                other => FeedError::Request(other.to_string()),
            })?;

        response
            .body_mut()
            .read_to_string()
            .map_err(|e| FeedError::Read(e.to_string()))
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let body = self.get_text(url)?;
        Ok(serde_json::from_str(&body)?)
    }

    pub fn fetch_notifications(&self, url: &str) -> Result<Vec<Notification>, FeedError> {
        let body = self.get_text(url)?;
        Ok(parse_notifications(&body)?)
    }
}
