//! Bell panel: rows, badge count and the "open" action.

use chrono::{DateTime, Local, TimeZone};
use tracing::debug;

use super::model::NotificationAction;
use super::repository::NotificationRepository;

pub const EMPTY_PLACEHOLDER: &str = "No notifications";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRow {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created: String,
    pub expiry: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelView {
    Empty { placeholder: &'static str },
    Rows(Vec<PanelRow>),
}

/// What the shell should do after "open" on a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOpen {
    Channel(String),
    Image(String),
    ShowText { title: String, body: String },
}

pub struct NotificationPanel {
    repo: NotificationRepository,
    open: bool,
}

impl NotificationPanel {
    pub fn new(repo: NotificationRepository) -> Self {
        Self { repo, open: false }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn render(&self) -> PanelView {
        let now = self.repo.clock().now().with_timezone(&Local);
        self.render_at(&now)
    }

    /// Render with labels computed in the time zone of `now`.
    pub fn render_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> PanelView
    where
        Tz::Offset: Copy,
    {
        let active = self.repo.list_active();
        if active.is_empty() {
            return PanelView::Empty {
                placeholder: EMPTY_PLACEHOLDER,
            };
        }
        PanelView::Rows(
            active
                .into_iter()
                .map(|n| PanelRow {
                    created: n.created_label(now),
                    expiry: n.expiry_label(now),
                    id: n.id,
                    title: n.title,
                    body: n.body,
                })
                .collect(),
        )
    }

    /// Closes the panel and returns what opening `id` should do, or `None`
    /// when the notification is gone.
    pub fn open(&mut self, id: &str) -> Option<NotificationOpen> {
        self.open = false;
        let n = self.repo.find(id)?;
        debug!("Opening notification {}", id);
        Some(match n.action() {
            NotificationAction::Channel(channel) => NotificationOpen::Channel(channel),
            NotificationAction::Image(name) => NotificationOpen::Image(name),
            NotificationAction::None => NotificationOpen::ShowText {
                title: n.title,
                body: n.body,
            },
        })
    }

    pub fn delete(&mut self, id: &str) -> PanelView {
        self.repo.remove(id);
        self.render()
    }

    pub fn clear_all(&mut self) -> PanelView {
        self.repo.remove_all();
        self.render()
    }

    /// Count of active notifications. Toasted items still count.
    pub fn update_badge(&self) -> usize {
        self.repo.list_active().len()
    }
}

#[cfg(test)]
#[path = "panel_tests.rs"]
mod tests;
