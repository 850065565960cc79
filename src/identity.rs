//! Outbound client identity (`User-Agent`) selection.
//!
//! A fetch can present itself as one of a few fixed browser profiles, as a
//! random one, or reuse the header the caller itself arrived with.

use rand::seq::SliceRandom;

/// Known browser profiles with a fixed header string each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserProfile {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Opera,
}

impl BrowserProfile {
    pub const ALL: [BrowserProfile; 5] = [
        BrowserProfile::Chrome,
        BrowserProfile::Firefox,
        BrowserProfile::Safari,
        BrowserProfile::Edge,
        BrowserProfile::Opera,
    ];

    /// Case-insensitive lookup by profile name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "chrome" => Some(Self::Chrome),
            "firefox" => Some(Self::Firefox),
            "safari" => Some(Self::Safari),
            "edge" => Some(Self::Edge),
            "opera" => Some(Self::Opera),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Safari => "safari",
            Self::Edge => "edge",
            Self::Opera => "opera",
        }
    }

    pub fn user_agent(self) -> &'static str {
        match self {
            Self::Chrome => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
            }
            Self::Firefox => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0"
            }
            Self::Safari => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15"
            }
            Self::Edge => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0"
            }
            Self::Opera => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 OPR/115.0.0.0"
            }
        }
    }

    /// Uniformly random profile.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self::ALL
            .choose(&mut rng)
            .copied()
            // ALL is non-empty, choose only returns None on empty slices
            .unwrap_or(Self::Chrome)
    }
}

/// Pick the `User-Agent` value for one fetch.
///
/// - a recognised `profile` maps to its fixed string
/// - an unrecognised `profile` falls back to a random known profile
/// - no `profile` uses the caller's `fallback` header verbatim
///
/// With neither a profile nor a fallback a random profile is used, so this
/// always yields a usable value.
pub fn select_user_agent(profile: Option<&str>, fallback: Option<&str>) -> String {
    match (profile, fallback) {
        (Some(name), _) => match BrowserProfile::from_name(name) {
            Some(p) => p.user_agent().to_string(),
            None => {
                let p = BrowserProfile::random();
                log::debug!("unknown browser profile {name:?}, using random {}", p.name());
                p.user_agent().to_string()
            }
        },
        (None, Some(fallback)) => fallback.to_string(),
        (None, None) => BrowserProfile::random().user_agent().to_string(),
    }
}
