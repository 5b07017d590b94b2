//! Data models for STV IPTV

use serde::{Deserialize, Serialize};

use crate::player::MediaDescriptor;

/// UI Tab selection, in swipe order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Live,
    World,
    Movies,
    Videos,
    Console,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Live, Tab::World, Tab::Movies, Tab::Videos, Tab::Console];

    /// Persisted name
    pub fn key(&self) -> &'static str {
        match self {
            Tab::Live => "envi",
            Tab::World => "envi2",
            Tab::Movies => "images",
            Tab::Videos => "videos",
            Tab::Console => "console",
        }
    }

    pub fn from_key(key: &str) -> Option<Tab> {
        Tab::ALL.into_iter().find(|t| t.key() == key.trim())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Live => "📺 Live",
            Tab::World => "🌍 World",
            Tab::Movies => "🎬 Movies",
            Tab::Videos => "▶ Videos",
            Tab::Console => "🖥 Console",
        }
    }

    pub fn index(&self) -> usize {
        Tab::ALL.iter().position(|t| t == self).unwrap_or(0)
    }
}

/// A card on the movies grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaCard {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Thumbnail
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default, rename = "srcVideo")]
    pub src_video: Option<String>,
    #[serde(default)]
    pub iframe: Option<String>,
    #[serde(default)]
    pub player: Option<String>,
}

impl MediaCard {
    /// First non-empty of the source fields
    pub fn source(&self) -> Option<&str> {
        [&self.video, &self.src_video, &self.iframe, &self.player]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(Some(self.name.as_str()).filter(|s| !s.is_empty()))
            .or(self.id.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("Video")
    }

    pub fn descriptor(&self) -> Option<MediaDescriptor> {
        let src = self.source()?;
        let mut d = MediaDescriptor::new(self.display_title(), src);
        d.id = self.id.clone().filter(|s| !s.is_empty());
        Some(d)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagesPage {
    #[serde(default = "default_images_title")]
    pub title: String,
    #[serde(default)]
    pub items: Vec<MediaCard>,
}

fn default_images_title() -> String {
    "Movies - STV".to_string()
}

impl Default for ImagesPage {
    fn default() -> Self {
        Self {
            title: default_images_title(),
            items: Vec::new(),
        }
    }
}

impl ImagesPage {
    /// Cards whose name contains `query`, case-insensitively
    pub fn search(&self, query: &str) -> Vec<&MediaCard> {
        let q = query.trim().to_lowercase();
        self.items
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&q))
            .collect()
    }

    /// Card to highlight for an `image:` action: an exact name match
    /// wins, else the first card whose name contains `name`.
    pub fn find_card(&self, name: &str) -> Option<usize> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return None;
        }
        self.items
            .iter()
            .position(|c| c.name.to_lowercase() == name)
            .or_else(|| {
                self.items
                    .iter()
                    .position(|c| c.name.to_lowercase().contains(&name))
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideosPage {
    #[serde(default = "default_videos_title")]
    pub title: String,
    #[serde(default)]
    pub items: Vec<VideoEntry>,
}

fn default_videos_title() -> String {
    "Videos - STV".to_string()
}

impl Default for VideosPage {
    fn default() -> Self {
        Self {
            title: default_videos_title(),
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub value: String,
    pub label: String,
}

impl ChannelEntry {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// One channel set (the live tab or the world tab)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSet {
    pub title: String,
    #[serde(default, rename = "defaultStream")]
    pub default_stream: String,
    /// Embed page URL with `{id}` standing for the channel value
    #[serde(default)]
    pub embed_template: String,
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

impl ChannelSet {
    pub fn embed_url(&self, channel: &str) -> String {
        self.embed_template.replace("{id}", channel)
    }

    pub fn label_for<'a>(&'a self, channel: &'a str) -> &'a str {
        self.channels
            .iter()
            .find(|c| c.value == channel)
            .map(|c| c.label.as_str())
            .unwrap_or(channel)
    }

    /// The persisted selection if it is still offered, else the default
    pub fn resolve<'a>(&'a self, saved: Option<&'a str>) -> &'a str {
        match saved {
            Some(s) if self.channels.iter().any(|c| c.value == s) => s,
            _ => &self.default_stream,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default = "default_live_set")]
    pub live: ChannelSet,
    #[serde(default = "default_world_set")]
    pub world: ChannelSet,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            live: default_live_set(),
            world: default_world_set(),
        }
    }
}

fn default_live_set() -> ChannelSet {
    ChannelSet {
        title: "Live".to_string(),
        default_stream: "liga1max".to_string(),
        embed_template: "https://streams.example/embed?stream={id}".to_string(),
        channels: vec![
            ChannelEntry::new("espn", "ESPN"),
            ChannelEntry::new("espn2", "ESPN2"),
            ChannelEntry::new("espn3", "ESPN3"),
            ChannelEntry::new("disney2", "Disney+"),
            ChannelEntry::new("beinsport_xtra_espanol", "BeiN Sports Xtra"),
            ChannelEntry::new("dsports", "DSports"),
            ChannelEntry::new("dsports2", "DSports2"),
            ChannelEntry::new("dsportsplus", "DSports+"),
            ChannelEntry::new("golperu", "Gol Perú"),
            ChannelEntry::new("liga1max", "L1 Max"),
            ChannelEntry::new("movistar", "Movistar"),
            ChannelEntry::new("premiere1", "Premiere 1"),
            ChannelEntry::new("premiere2", "Premiere 2"),
            ChannelEntry::new("premiere3", "Premiere 3"),
        ],
    }
}

fn default_world_set() -> ChannelSet {
    ChannelSet {
        title: "Rest of the World".to_string(),
        default_stream: "history".to_string(),
        embed_template: "https://streams.example/world/{id}.html".to_string(),
        channels: vec![
            ChannelEntry::new("history", "History"),
            ChannelEntry::new("discovery", "Discovery"),
            ChannelEntry::new("natgeo", "Nat Geo"),
            ChannelEntry::new("tooncast", "Tooncast"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> ImagesPage {
        serde_json::from_str(
            r#"{"title":"Pelis","items":[
                {"name":"Dune Part Two","url":"d.jpg","video":"https://cdn.test/dune2.mp4"},
                {"name":"Dune","url":"d1.jpg","srcVideo":"https://cdn.test/dune.mp4","id":"d1"},
                {"name":"Alien","url":"a.jpg","iframe":"https://player.test/embed/alien"},
                {"name":"Blank","url":"b.jpg","video":"  "}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_tab_keys_round_trip() {
        for tab in Tab::ALL {
            assert_eq!(Tab::from_key(tab.key()), Some(tab));
        }
        assert_eq!(Tab::from_key("bogus"), None);
        assert_eq!(Tab::Videos.index(), 3);
    }

    #[test]
    fn test_find_card_prefers_exact_match() {
        let p = page();
        assert_eq!(p.find_card("dune"), Some(1));
        assert_eq!(p.find_card("DUNE PART"), Some(0));
        assert_eq!(p.find_card("ali"), Some(2));
        assert_eq!(p.find_card("nothing"), None);
        assert_eq!(p.find_card(""), None);
    }

    #[test]
    fn test_card_descriptor() {
        let p = page();
        let d = p.items[1].descriptor().unwrap();
        assert_eq!(d.src, "https://cdn.test/dune.mp4");
        assert_eq!(d.id.as_deref(), Some("d1"));
        assert_eq!(d.title, "Dune");
        assert!(p.items[3].descriptor().is_none());
    }

    #[test]
    fn test_search() {
        let p = page();
        assert_eq!(p.search("DUNE").len(), 2);
        assert_eq!(p.search("").len(), 4);
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let p: ImagesPage = serde_json::from_str("{}").unwrap();
        assert_eq!(p, ImagesPage::default());
        let c: ChannelsConfig = serde_json::from_str(r#"{"world":{"title":"W"}}"#).unwrap();
        assert_eq!(c.live, ChannelsConfig::default().live);
        assert!(c.world.channels.is_empty());
    }

    #[test]
    fn test_bundled_data_parses() {
        use crate::player::MediaKind;

        let images: ImagesPage = serde_json::from_str(include_str!("../data/images.json")).unwrap();
        assert_eq!(images.find_card("DUNE"), Some(0));
        let kinds: Vec<MediaKind> = images
            .items
            .iter()
            .filter_map(|c| c.descriptor())
            .map(|d| d.kind())
            .collect();
        assert_eq!(kinds, vec![MediaKind::File, MediaKind::Hls, MediaKind::Embed]);

        let videos: VideosPage = serde_json::from_str(include_str!("../data/videos.json")).unwrap();
        assert_eq!(videos.items.len(), 2);

        let channels: ChannelsConfig =
            serde_json::from_str(include_str!("../data/channels.json")).unwrap();
        assert_eq!(channels.live.resolve(None), "liga1max");
        assert_eq!(channels.world.resolve(Some("natgeo")), "natgeo");

        let notes =
            crate::notifications::parse_notifications(include_str!("../data/notifications.json"))
                .unwrap();
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[2].body, "Dune is now available.");
        assert_eq!(notes[2].action.as_deref(), Some("image:dune"));
    }

    #[test]
    fn test_channel_set_resolution() {
        let set = ChannelsConfig::default().live;
        assert_eq!(set.resolve(Some("espn2")), "espn2");
        assert_eq!(set.resolve(Some("gone")), "liga1max");
        assert_eq!(set.resolve(None), "liga1max");
        assert_eq!(set.label_for("golperu"), "Gol Perú");
        // Unknown values label themselves
        let unknown = String::from("popup-channel");
        assert_eq!(set.label_for(&unknown), "popup-channel");
        assert_eq!(set.embed_url("espn"), "https://streams.example/embed?stream=espn");
    }
}
