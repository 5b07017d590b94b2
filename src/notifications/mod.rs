//! Notification lifecycle: persisted list, toast rotation, live polling and
//! the bell panel.

pub mod model;
pub mod panel;
pub mod poller;
pub mod repository;
pub mod sequencer;

pub use model::{parse_notifications, Notification, NotificationAction};
pub use panel::{NotificationOpen, NotificationPanel, PanelRow, PanelView};
pub use poller::{LivePoller, PollerTiming};
pub use repository::NotificationRepository;
pub use sequencer::{SequencerState, SequencerTiming, Toast, ToastSequencer};
