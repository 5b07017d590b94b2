//! Media player overlay: transport state machine, resume points, gestures
//! and the capability-driven control set, plus the egui window and the
//! FFmpeg-backed element that render it on the desktop.

pub mod capabilities;
pub mod element;
pub mod gesture;
pub mod launcher;
pub mod media;
pub mod overlay;
pub mod resume;
pub mod window;

pub use media::{MediaDescriptor, MediaKind};
pub use overlay::{PlayerOverlay, PlayerState};
pub use resume::ResumeStore;
pub use window::{PlayerAction, PlayerWindow};
