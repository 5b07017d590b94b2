//! Notification record and the permissive JSON shape it is read from

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A normalised notification. Everything downstream of ingest works on this
/// type; the loose remote shape only exists in [`RawNotification`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// What "open" does for a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationAction {
    /// `canal:<id>` - switch to the live tab and select the channel
    Channel(String),
    /// `image:<name>` - switch to the movie grid and highlight the card
    Image(String),
    None,
}

impl NotificationAction {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("canal:") {
            let id = rest.split(':').next().unwrap_or("").trim();
            if !id.is_empty() {
                return NotificationAction::Channel(id.to_string());
            }
        } else if let Some(rest) = raw.strip_prefix("image:") {
            let name = rest.trim().to_lowercase();
            if !name.is_empty() {
                return NotificationAction::Image(name);
            }
        }
        NotificationAction::None
    }
}

impl Notification {
    pub fn new(id: &str, title: &str, body: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            created: None,
            expire_days: None,
            action: None,
        }
    }

    /// `created + expire_days`, or `None` for a notification that never expires.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let created = self.created?;
        let days = Duration::try_days(self.expire_days?)?;
        created.checked_add_signed(days)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| now > at)
    }

    pub fn action(&self) -> NotificationAction {
        self.action
            .as_deref()
            .map(NotificationAction::parse)
            .unwrap_or(NotificationAction::None)
    }

    /// Creation date as `DD-MM`; notifications without one show today's date.
    pub fn created_label<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: Copy,
    {
        let tz = now.timezone();
        match self.created {
            Some(created) => format_ddmm(&created.with_timezone(&tz)),
            None => format_ddmm(now),
        }
    }

    /// Panel label: `Today*`, `Expires: Nd` or `∞`.
    pub fn expiry_label<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: Copy,
    {
        let Some(days) = self.expire_days else {
            return "∞".to_string();
        };
        if self.expires_on_day_of(now) {
            "Today*".to_string()
        } else {
            format!("Expires: {}d", days)
        }
    }

    /// Toast meta line: `Today*`, the expiry date, or nothing for
    /// non-expiring notifications.
    pub fn toast_meta<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: Copy,
    {
        if self.expire_days.is_none() {
            return String::new();
        }
        if self.expires_on_day_of(now) {
            return "Today*".to_string();
        }
        match self.effective_expiry(now) {
            Some(at) => format_ddmm(&at.with_timezone(&now.timezone())),
            None => String::new(),
        }
    }

    fn effective_expiry<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
        let base = self.created.unwrap_or_else(|| now.with_timezone(&Utc));
        let days = Duration::try_days(self.expire_days?)?;
        base.checked_add_signed(days)
    }

    fn expires_on_day_of<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool
    where
        Tz::Offset: Copy,
    {
        match self.effective_expiry(now) {
            Some(at) => at.with_timezone(&now.timezone()).date_naive() == now.date_naive(),
            None => false,
        }
    }
}

fn format_ddmm<Tz: TimeZone>(t: &DateTime<Tz>) -> String {
    format!("{:02}-{:02}", t.day(), t.month())
}

/// The remote record as published. Field aliases and loose types are
/// accepted here and nowhere else.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNotification {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub expire_days: Option<Value>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub accion: Option<String>,
    #[serde(default)]
    pub open: Option<String>,
}

impl RawNotification {
    /// Returns `None` for records without a usable id.
    pub fn normalize(self) -> Option<Notification> {
        let id = match self.id? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if id.is_empty() {
            return None;
        }

        let body = self
            .body
            .filter(|b| !b.is_empty())
            .or(self.content)
            .unwrap_or_default();

        let expire_days = match self.expire_days {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        let action = self
            .action
            .or(self.accion)
            .or(self.open)
            .filter(|a| !a.trim().is_empty());

        Some(Notification {
            id,
            title: self.title.unwrap_or_default(),
            body,
            created: self.created.as_deref().and_then(parse_timestamp),
            expire_days,
            action,
        })
    }
}

/// RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (read as UTC) or a bare date.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Parse a JSON array of notification records. Individual malformed records
/// are skipped; only a document that is not an array is an error.
pub fn parse_notifications(json: &str) -> Result<Vec<Notification>, serde_json::Error> {
    let values: Vec<Value> = serde_json::from_str(json)?;
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<RawNotification>(value) {
            Ok(raw) => {
                if let Some(n) = raw.normalize() {
                    out.push(n);
                }
            }
            Err(e) => debug!("Skipping malformed notification: {}", e),
        }
    }
    Ok(out)
}
