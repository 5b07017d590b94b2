//! Runtime capabilities, probed once per open, and the transport controls
//! they allow.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackCapabilities {
    pub picture_in_picture: bool,
    pub cast: bool,
    /// The whole player surface (with its close button) can go fullscreen.
    pub modal_fullscreen: bool,
    /// Only the bare video surface can go fullscreen.
    pub element_fullscreen: bool,
    /// Installed-app mode where picture-in-picture is not usable even if
    /// reported.
    pub standalone_app: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenTarget {
    Modal,
    Element,
}

impl PlaybackCapabilities {
    pub fn fullscreen_target(&self) -> Option<FullscreenTarget> {
        if self.modal_fullscreen {
            Some(FullscreenTarget::Modal)
        } else if self.element_fullscreen {
            Some(FullscreenTarget::Element)
        } else {
            None
        }
    }
}

pub trait CapabilityProbe {
    fn probe(&self) -> PlaybackCapabilities;
}

/// Which optional buttons the transport bar renders. Play/pause, skip,
/// scrub and mute are always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportControls {
    pub picture_in_picture: bool,
    pub cast: bool,
    pub fullscreen: Option<FullscreenTarget>,
}

impl TransportControls {
    pub fn from_capabilities(caps: &PlaybackCapabilities) -> Self {
        Self {
            picture_in_picture: caps.picture_in_picture && !caps.standalone_app,
            cast: caps.cast,
            fullscreen: caps.fullscreen_target(),
        }
    }
}
