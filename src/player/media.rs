//! Media descriptors and the element/stream-client seams the overlay
//! drives.

use thiserror::Error;

use crate::store::RESUME_PREFIX;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback not supported in this build")]
    Unsupported,
    #[error("no source loaded")]
    NoSource,
    #[error("failed to open stream: {0}")]
    Open(String),
    #[error("decoder error: {0}")]
    Decode(String),
}

const FILE_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mkv", "mov", "m4v", "ts"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    File,
    Hls,
    /// A web page hosting its own player; never decoded in-process.
    Embed,
}

impl MediaKind {
    pub fn classify(url: &str) -> Self {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_lowercase();
        let ext = match path.rsplit_once('.') {
            Some((_, ext)) if !ext.contains('/') => ext,
            _ => return MediaKind::Embed,
        };
        if ext == "m3u8" {
            MediaKind::Hls
        } else if FILE_EXTENSIONS.contains(&ext) {
            MediaKind::File
        } else {
            MediaKind::Embed
        }
    }
}

/// What the overlay is asked to play.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaDescriptor {
    pub id: Option<String>,
    pub title: String,
    pub src: String,
}

impl MediaDescriptor {
    pub fn new(title: &str, src: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            src: src.to_string(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::classify(&self.src)
    }

    /// Store key for this item's resume point: id, else title, else source.
    pub fn resume_key(&self) -> String {
        let ident = self
            .id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(Some(self.title.as_str()).filter(|s| !s.is_empty()))
            .unwrap_or(&self.src);
        format!("{}{}", RESUME_PREFIX, ident)
    }
}

/// A playable surface. Times are in seconds.
pub trait MediaElement {
    fn set_source(&mut self, url: &str);
    fn clear_source(&mut self);
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn has_ended(&self) -> bool;
    fn current_time(&self) -> f64;
    fn seek(&mut self, t: f64);
    /// `None` until metadata is known (or for live streams).
    fn duration(&self) -> Option<f64>;
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;
}

/// Segment-level HLS client that feeds an element instead of the element
/// loading the manifest itself.
pub trait StreamClient {
    fn attach(&mut self, element: &mut dyn MediaElement, manifest_url: &str)
        -> Result<(), PlaybackError>;
    fn destroy(&mut self);
}

pub trait StreamClientFactory {
    /// `None` when no client is available; the element then loads the
    /// manifest URL directly.
    fn create(&self) -> Option<Box<dyn StreamClient>>;
}

/// For elements that understand HLS manifests natively.
pub struct NativeHls;

impl StreamClientFactory for NativeHls {
    fn create(&self) -> Option<Box<dyn StreamClient>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(MediaKind::classify("https://cdn.test/a/movie.MP4"), MediaKind::File);
        assert_eq!(MediaKind::classify("https://cdn.test/clip.webm?token=1"), MediaKind::File);
        assert_eq!(MediaKind::classify("/local/seg.ts"), MediaKind::File);
        assert_eq!(MediaKind::classify("https://cdn.test/live/index.m3u8?x=y"), MediaKind::Hls);
        assert_eq!(MediaKind::classify("https://player.test/embed/123"), MediaKind::Embed);
        assert_eq!(MediaKind::classify("https://player.test/watch.php"), MediaKind::Embed);
        assert_eq!(MediaKind::classify("https://v1.player.test/embed"), MediaKind::Embed);
    }

    #[test]
    fn test_resume_key_fallbacks() {
        let d = MediaDescriptor::new("Dune", "https://cdn.test/dune.mp4");
        assert_eq!(d.resume_key(), "stv_resume_Dune");
        assert_eq!(d.clone().with_id("m42").resume_key(), "stv_resume_m42");
        assert_eq!(
            MediaDescriptor::new("", "https://cdn.test/x.mp4").resume_key(),
            "stv_resume_https://cdn.test/x.mp4"
        );
    }
}
