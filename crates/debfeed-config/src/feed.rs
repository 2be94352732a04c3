use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, Result};

/// An APT package feed to trust and enable.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Feed {
    /// Unique name of the feed.
    /// Used for the keyring, source definition and credentials file names.
    pub name: String,

    /// Base URL of the APT repository.
    /// `{distro}` and `{codename}` are replaced with the detected values.
    pub url: String,

    /// URL of the GPG public key signing the feed (ASCII-armored or binary).
    pub key_url: String,

    /// Suite served by the feed.
    /// Default: "{codename}"
    pub suite: Option<String>,

    /// Components to enable.
    /// Default: ["main"]
    pub components: Option<Vec<String>>,

    /// Whether the feed requires the access user and token.
    /// Default: false
    pub authenticated: Option<bool>,

    /// Whether the feed is configured at all.
    /// Default: true
    pub enabled: Option<bool>,
}

impl Feed {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.unwrap_or(false)
    }

    pub fn components(&self) -> Vec<String> {
        self.components
            .clone()
            .filter(|components| !components.is_empty())
            .unwrap_or_else(|| vec!["main".to_string()])
    }

    /// Repository URL with placeholders substituted and without a trailing slash.
    pub fn repository_url(&self, distro: &str, codename: &str) -> String {
        substitute_placeholders(&self.url, distro, codename)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn suite(&self, distro: &str, codename: &str) -> String {
        substitute_placeholders(
            self.suite.as_deref().unwrap_or("{codename}"),
            distro,
            codename,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_feed_name(&self.name) {
            return Err(ConfigError::InvalidFeedName(self.name.clone()));
        }

        // placeholders are substituted with plain words, so they cannot affect validity
        for (field, value) in [("url", &self.url), ("key_url", &self.key_url)] {
            let probe = substitute_placeholders(value, "distro", "codename");
            let valid = Url::parse(&probe)
                .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::InvalidFeedUrl {
                    name: self.name.clone(),
                    field,
                    value: value.clone(),
                });
            }
        }

        Ok(())
    }
}

fn is_valid_feed_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
}

/// Substitute `{distro}` and `{codename}` in a feed template.
pub fn substitute_placeholders(template: &str, distro: &str, codename: &str) -> String {
    template
        .replace("{distro}", distro)
        .replace("{codename}", codename)
}

#[derive(Default)]
pub struct DefaultFeedInfo {
    pub name: &'static str,
    pub url: &'static str,
    pub key_url: &'static str,
    pub authenticated: Option<bool>,
}

pub fn get_default_feeds() -> Vec<DefaultFeedInfo> {
    vec![
        DefaultFeedInfo {
            name: "example-private",
            url: "https://packages.example.com/private/{distro}",
            key_url: "https://packages.example.com/private/gpg.key",
            authenticated: Some(true),
        },
        DefaultFeedInfo {
            name: "example-public",
            url: "https://packages.example.com/public/{distro}",
            key_url: "https://packages.example.com/public/gpg.key",
            ..DefaultFeedInfo::default()
        },
    ]
}
