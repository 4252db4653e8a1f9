//! Fetcher settings, embedded at compile time from `config/fetcher.toml`.
//!
//! Settings are immutable once loaded and handed to
//! [`SourceFetcher::new`](crate::fetcher::SourceFetcher::new).

use std::time::Duration;

use serde::Deserialize;

const FETCHER_TOML: &str = include_str!("../config/fetcher.toml");

/// Timeout, client identification and the ordered network paths.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherSettings {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` sent with every attempt. Some providers block
    /// non-browser clients.
    pub user_agent: String,
    /// Network paths in the order they are tried.
    pub paths: Vec<NetworkPath>,
}

/// A route to an upstream source, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkPath {
    /// Straight to the provider.
    Direct {
        /// Path identifier.
        id: String,
    },
    /// A relay that takes the full target URL appended to `prefix`.
    UrlPrefix {
        /// Path identifier.
        id: String,
        /// Relay URL prefix (e.g., `"https://corsproxy.io/?"`).
        prefix: String,
        /// Whether the target URL is percent-encoded before appending.
        #[serde(default)]
        encode: bool,
    },
    /// A forward HTTP proxy.
    HttpProxy {
        /// Path identifier.
        id: String,
        /// Proxy URL (e.g., `"http://10.0.0.1:3128"`).
        proxy_url: String,
    },
}

impl NetworkPath {
    /// The path identifier regardless of variant.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Direct { id } | Self::UrlPrefix { id, .. } | Self::HttpProxy { id, .. } => id,
        }
    }

    /// Whether the request reaches the provider without an intermediary.
    #[must_use]
    pub const fn is_direct(&self) -> bool {
        matches!(self, Self::Direct { .. })
    }

    /// Rewrites a fully-built target URL for this path.
    #[must_use]
    pub fn route_url(&self, target: &str) -> String {
        match self {
            Self::Direct { .. } | Self::HttpProxy { .. } => target.to_string(),
            Self::UrlPrefix {
                prefix,
                encode: true,
                ..
            } => format!("{prefix}{}", urlencoding::encode(target)),
            Self::UrlPrefix {
                prefix,
                encode: false,
                ..
            } => format!("{prefix}{target}"),
        }
    }

    /// Forward proxy to configure on the client, if any.
    #[must_use]
    pub fn proxy(&self) -> Option<&str> {
        match self {
            Self::HttpProxy { proxy_url, .. } => Some(proxy_url),
            Self::Direct { .. } | Self::UrlPrefix { .. } => None,
        }
    }
}

impl FetcherSettings {
    /// Returns the embedded settings.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (this is a compile-time
    /// guarantee since the config is embedded).
    #[must_use]
    pub fn embedded() -> Self {
        toml::de::from_str(FETCHER_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse fetcher.toml: {e}"))
    }

    /// Per-attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
