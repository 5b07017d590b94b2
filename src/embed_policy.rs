//! Embedded-content policy: which pages may be opened as popups and which
//! embed sources may be shown, with the restrictions applied to the
//! allowed ones.

use url::Url;

const ALLOWED_HOSTS: &[&str] = &["youtube.com", "vimeo.com", "dailymotion.com", "twitch.tv"];

const AD_PATTERNS: &[&str] = &[
    "/ads/",
    "/advertisement/",
    "/popup/",
    "/banner/",
    "doubleclick.net",
    "googleadsyndication.com",
    "googlesyndication.com",
    "adsystem.com",
    "adservice.google",
    "facebook.com/plugins/",
    "tracking",
    "analytics",
    "beacon",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPolicy {
    pub allowed: bool,
    pub sandbox: &'static str,
    pub referrer_policy: &'static str,
}

impl SandboxPolicy {
    fn allow() -> Self {
        Self {
            allowed: true,
            sandbox: "allow-scripts allow-same-origin",
            referrer_policy: "no-referrer",
        }
    }

    fn block() -> Self {
        Self {
            allowed: false,
            ..Self::allow()
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbedPolicy {
    /// Hosts the app's own embed pages are served from, always trusted
    home_hosts: Vec<String>,
    allowed_hosts: Vec<String>,
    ad_patterns: Vec<String>,
}

impl Default for EmbedPolicy {
    fn default() -> Self {
        Self {
            home_hosts: Vec::new(),
            allowed_hosts: ALLOWED_HOSTS.iter().map(|s| s.to_string()).collect(),
            ad_patterns: AD_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl EmbedPolicy {
    /// Trust the hosts of the given page URLs. Unparseable entries are
    /// skipped.
    pub fn with_homes(home_urls: &[&str]) -> Self {
        Self {
            home_hosts: home_urls
                .iter()
                .filter_map(|u| Url::parse(u.trim()).ok())
                .filter_map(|u| u.host_str().map(str::to_lowercase))
                .collect(),
            ..Self::default()
        }
    }

    pub fn allow_host(mut self, host: &str) -> Self {
        self.allowed_hosts.push(host.trim().to_lowercase());
        self
    }

    fn is_trusted_host(&self, host: &str) -> bool {
        if self.home_hosts.iter().any(|h| h == host) {
            return true;
        }
        self.allowed_hosts
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{}", d)))
    }

    fn looks_like_ad(&self, url: &str) -> bool {
        self.ad_patterns.iter().any(|p| url.contains(p.as_str()))
    }

    /// Popups are only opened for trusted hosts, and never for ad URLs.
    /// Unparseable URLs are refused.
    pub fn should_allow_popup(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return false;
        };
        let Some(host) = parsed.host_str().map(str::to_lowercase) else {
            return false;
        };
        self.is_trusted_host(&host) && !self.looks_like_ad(parsed.as_str())
    }

    /// A page that may be handed to the system opener: an absolute
    /// `http`/`https` URL with a host that passes `sandbox_policy_for`.
    /// Returned re-serialised, so it carries no raw shell metacharacters
    /// beyond what the URL grammar allows.
    pub fn web_page_url(&self, src: &str) -> Option<Url> {
        let parsed = Url::parse(src.trim()).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return None;
        }
        self.sandbox_policy_for(parsed.as_str())
            .allowed
            .then_some(parsed)
    }

    /// Trusted hosts are always shown. Other sources are shown unless they
    /// match an ad pattern. An empty or unparseable source is let through.
    pub fn sandbox_policy_for(&self, frame_src: &str) -> SandboxPolicy {
        let src = frame_src.trim();
        if src.is_empty() {
            return SandboxPolicy::allow();
        }
        let Ok(parsed) = Url::parse(src) else {
            return SandboxPolicy::allow();
        };
        let trusted = parsed
            .host_str()
            .map(|h| self.is_trusted_host(&h.to_lowercase()))
            .unwrap_or(false);
        if trusted || !self.looks_like_ad(parsed.as_str()) {
            SandboxPolicy::allow()
        } else {
            SandboxPolicy::block()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popup_only_for_trusted_hosts() {
        let policy = EmbedPolicy::default();
        assert!(policy.should_allow_popup("https://www.youtube.com/watch?v=x"));
        assert!(policy.should_allow_popup("https://twitch.tv/somebody"));
        assert!(!policy.should_allow_popup("https://evil.example/win"));
        assert!(!policy.should_allow_popup("https://notyoutube.com/"));
        assert!(!policy.should_allow_popup("not a url"));
        assert!(!policy.should_allow_popup("https://vimeo.com/ads/1"));
    }

    #[test]
    fn test_home_host_is_trusted() {
        let policy = EmbedPolicy::with_homes(&[
            "https://streams.example/embed?stream={id}",
            "https://world.example/{id}.html",
            "nonsense",
        ]);
        assert!(policy.should_allow_popup("https://streams.example/other"));
        assert!(policy.should_allow_popup("https://world.example/history.html"));
        assert!(!EmbedPolicy::default().should_allow_popup("https://streams.example/other"));
    }

    #[test]
    fn test_frame_sources() {
        let policy = EmbedPolicy::default();
        let ok = policy.sandbox_policy_for("https://player.test/embed/1");
        assert!(ok.allowed);
        assert_eq!(ok.sandbox, "allow-scripts allow-same-origin");
        assert_eq!(ok.referrer_policy, "no-referrer");

        assert!(!policy.sandbox_policy_for("https://ad.doubleclick.net/x").allowed);
        assert!(!policy.sandbox_policy_for("https://cdn.test/banner/top.html").allowed);
        // Trusted hosts win over patterns
        assert!(policy.sandbox_policy_for("https://www.youtube.com/embed/x?analytics=1").allowed);
        assert!(policy.sandbox_policy_for("").allowed);
        assert!(policy.sandbox_policy_for("::garbage::").allowed);
    }

    #[test]
    fn test_web_page_url_only_accepts_http() {
        let policy = EmbedPolicy::default();
        let page = policy
            .web_page_url(" https://www.youtube.com/watch?v=a&list=b c ")
            .unwrap();
        assert_eq!(page.as_str(), "https://www.youtube.com/watch?v=a&list=b%20c");
        assert!(policy.web_page_url("http://player.test/embed/1").is_some());

        assert!(policy.web_page_url("file:///etc/passwd").is_none());
        assert!(policy.web_page_url("javascript:alert(1)").is_none());
        assert!(policy.web_page_url("calc.exe").is_none());
        assert!(policy.web_page_url("").is_none());
        assert!(policy.web_page_url("https://ad.doubleclick.net/x").is_none());
    }

    #[test]
    fn test_extra_hosts() {
        let policy = EmbedPolicy::default().allow_host("Streams.Test");
        assert!(policy.should_allow_popup("https://live.streams.test/a"));
    }
}
