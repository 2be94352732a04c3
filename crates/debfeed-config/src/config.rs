use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use debfeed_utils::{
    fs::ensure_dir_exists,
    path::{resolve_path, xdg_state_home},
};
use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::{annotate_toml_array_of_tables, annotate_toml_table},
    error::{ConfigError, Result},
    feed::{get_default_feeds, Feed},
    hook::HookConfig,
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/debfeed/config.toml";

/// debfeed configuration
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Package installed once every feed is configured.
    pub package: String,

    /// Directory where dearmored feed keyrings are written.
    /// Default: /usr/share/keyrings
    pub keyring_dir: Option<String>,

    /// Directory where APT source definitions are written.
    /// Default: /etc/apt/sources.list.d
    pub sources_dir: Option<String>,

    /// Directory where APT credentials are written.
    /// Default: /etc/apt/auth.conf.d
    pub auth_dir: Option<String>,

    /// Log file. Falls back to $XDG_STATE_HOME/debfeed/debfeed.log when not writable.
    /// Default: /var/log/debfeed.log
    pub log_file: Option<String>,

    /// os-release file consulted first during distro detection.
    /// Default: /etc/os-release
    pub os_release_path: Option<String>,

    /// lsb-release file consulted when os-release is incomplete.
    /// Default: /etc/lsb-release
    pub lsb_release_path: Option<String>,

    /// Timeout in seconds for key downloads. Unset means no timeout.
    pub http_timeout: Option<u64>,

    /// Feeds to configure, in order.
    pub feeds: Vec<Feed>,

    /// Symlink, validate and restart steps run by `debfeed post-install`.
    pub hook: HookConfig,
}

/// Picks the configuration file: explicit override, then `DEBFEED_CONFIG`, then the system
/// default.
pub fn config_path(override_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(resolve_path(path)?);
    }
    match std::env::var("DEBFEED_CONFIG") {
        Ok(path) => Ok(resolve_path(&path)?),
        Err(_) => Ok(PathBuf::from(DEFAULT_CONFIG_PATH)),
    }
}

impl Config {
    pub fn default_config() -> Self {
        let feeds = get_default_feeds()
            .into_iter()
            .map(|info| {
                Feed {
                    name: info.name.to_string(),
                    url: info.url.to_string(),
                    key_url: info.key_url.to_string(),
                    suite: Some("{codename}".to_string()),
                    components: Some(vec!["main".to_string()]),
                    authenticated: info.authenticated,
                    enabled: Some(true),
                }
            })
            .collect();

        Self {
            package: "example-agent".to_string(),
            keyring_dir: Some("/usr/share/keyrings".to_string()),
            sources_dir: Some("/etc/apt/sources.list.d".to_string()),
            auth_dir: Some("/etc/apt/auth.conf.d".to_string()),
            log_file: Some("/var/log/debfeed.log".to_string()),
            os_release_path: Some("/etc/os-release".to_string()),
            lsb_release_path: Some("/etc/lsb-release".to_string()),
            http_timeout: None,
            feeds,
            hook: HookConfig::default_config(),
        }
    }

    /// Loads the configuration from `path`.
    /// If the file does not exist, the default configuration is used.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "config file {} not found, using defaults",
                    path.display()
                );
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    pub fn resolve(&mut self) -> Result<()> {
        if self.package.trim().is_empty() {
            return Err(ConfigError::EmptyPackage);
        }

        let mut seen_feeds = HashSet::new();
        let mut authenticated = Vec::new();

        for feed in &self.feeds {
            feed.validate()?;
            if !seen_feeds.insert(&feed.name) {
                return Err(ConfigError::DuplicateFeedName(feed.name.clone()));
            }
            if feed.is_enabled() && feed.is_authenticated() {
                authenticated.push(feed.name.as_str());
            }
        }

        if authenticated.len() > 1 {
            return Err(ConfigError::MultipleAuthenticatedFeeds(
                authenticated.join(", "),
            ));
        }

        self.hook.validate()?;

        for feed in &mut self.feeds {
            feed.enabled.get_or_insert(true);
            feed.authenticated.get_or_insert(false);
        }

        Ok(())
    }

    pub fn enabled_feeds(&self) -> impl Iterator<Item = &Feed> {
        self.feeds.iter().filter(|feed| feed.is_enabled())
    }

    pub fn get_keyring_dir(&self) -> Result<PathBuf> {
        path_setting("DEBFEED_KEYRING_DIR", &self.keyring_dir, "/usr/share/keyrings")
    }

    pub fn get_sources_dir(&self) -> Result<PathBuf> {
        path_setting(
            "DEBFEED_SOURCES_DIR",
            &self.sources_dir,
            "/etc/apt/sources.list.d",
        )
    }

    pub fn get_auth_dir(&self) -> Result<PathBuf> {
        path_setting("DEBFEED_AUTH_DIR", &self.auth_dir, "/etc/apt/auth.conf.d")
    }

    pub fn get_log_file(&self) -> Result<PathBuf> {
        path_setting("DEBFEED_LOG_FILE", &self.log_file, "/var/log/debfeed.log")
    }

    /// Log file used when [`Config::get_log_file`] cannot be opened.
    pub fn fallback_log_file(&self) -> PathBuf {
        xdg_state_home().join("debfeed").join("debfeed.log")
    }

    pub fn get_os_release_path(&self) -> Result<PathBuf> {
        path_setting(
            "DEBFEED_OS_RELEASE",
            &self.os_release_path,
            "/etc/os-release",
        )
    }

    pub fn get_lsb_release_path(&self) -> Result<PathBuf> {
        path_setting(
            "DEBFEED_LSB_RELEASE",
            &self.lsb_release_path,
            "/etc/lsb-release",
        )
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout.map(Duration::from_secs)
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(hook_table) = doc.get_mut("hook").and_then(|item| item.as_table_mut()) {
            annotate_toml_table::<HookConfig>(hook_table, false)?;
        }

        if let Some(feeds_array) = doc
            .get_mut("feeds")
            .and_then(|item| item.as_array_of_tables_mut())
        {
            annotate_toml_array_of_tables::<Feed>(feeds_array)?;
        }

        Ok(doc)
    }
}

fn path_setting(env_var: &str, value: &Option<String>, default: &str) -> Result<PathBuf> {
    if let Ok(env_path) = std::env::var(env_var) {
        return Ok(resolve_path(&env_path)?);
    }
    Ok(resolve_path(value.as_deref().unwrap_or(default))?)
}

pub fn generate_default_config(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        ensure_dir_exists(parent)?;
    }

    fs::write(config_path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use tempfile::tempdir;

    use super::*;
    use crate::test_utils::with_env;

    fn extra_feed(name: &str) -> Feed {
        Feed {
            name: name.to_string(),
            url: "https://example.org/deb".to_string(),
            key_url: "https://example.org/key.asc".to_string(),
            suite: None,
            components: None,
            authenticated: None,
            enabled: None,
        }
    }

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.package, "example-agent");
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.enabled_feeds().count(), 2);
        assert!(config.http_timeout().is_none());
    }

    #[test]
    fn test_default_config_resolves() {
        let mut config = Config::default_config();
        assert!(config.resolve().is_ok());
    }

    #[test]
    fn test_resolve_duplicate_feed() {
        let mut config = Config::default_config();
        config.feeds.push(extra_feed("dup"));
        config.feeds.push(extra_feed("dup"));

        assert!(matches!(
            config.resolve(),
            Err(ConfigError::DuplicateFeedName(name)) if name == "dup"
        ));
    }

    #[test]
    fn test_resolve_multiple_authenticated() {
        let mut config = Config::default_config();
        let mut feed = extra_feed("second-private");
        feed.authenticated = Some(true);
        config.feeds.push(feed);

        assert!(matches!(
            config.resolve(),
            Err(ConfigError::MultipleAuthenticatedFeeds(_))
        ));
    }

    #[test]
    fn test_resolve_disabled_authenticated_feed_is_ignored() {
        let mut config = Config::default_config();
        let mut feed = extra_feed("second-private");
        feed.authenticated = Some(true);
        feed.enabled = Some(false);
        config.feeds.push(feed);

        assert!(config.resolve().is_ok());
        assert_eq!(config.enabled_feeds().count(), 2);
    }

    #[test]
    fn test_resolve_fills_feed_defaults() {
        let mut config = Config::default_config();
        config.feeds.push(extra_feed("extra"));
        config.resolve().unwrap();

        let feed = config.feeds.iter().find(|feed| feed.name == "extra").unwrap();
        assert_eq!(feed.enabled, Some(true));
        assert_eq!(feed.authenticated, Some(false));
    }

    #[test]
    fn test_resolve_empty_package() {
        let mut config = Config::default_config();
        config.package = "  ".to_string();
        assert!(matches!(config.resolve(), Err(ConfigError::EmptyPackage)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.package, "example-agent");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
package = "acme-agent"
http_timeout = 30

[[feeds]]
name = "acme"
url = "https://deb.acme.test/{distro}"
key_url = "https://deb.acme.test/key.gpg"
authenticated = true

[hook]
source = "/opt/acme/agent.toml"
destination = "/etc/acme/agent.toml"
validator = ["acme-agent", "--check", "{config}"]
restart = ["systemctl", "restart", "acme-agent"]
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.package, "acme-agent");
        assert_eq!(config.http_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.feeds.len(), 1);
        assert!(config.feeds[0].is_authenticated());
        assert!(config.keyring_dir.is_none());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "package = [").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::TomlDeError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_path_defaults() {
        with_env(
            &[("DEBFEED_KEYRING_DIR", None), ("DEBFEED_SOURCES_DIR", None)],
            || {
                let mut config = Config::default_config();
                config.keyring_dir = None;
                assert_eq!(
                    config.get_keyring_dir().unwrap(),
                    PathBuf::from("/usr/share/keyrings")
                );
                assert_eq!(
                    config.get_sources_dir().unwrap(),
                    PathBuf::from("/etc/apt/sources.list.d")
                );
            },
        );
    }

    #[test]
    #[serial]
    fn test_path_env_override() {
        with_env(&[("DEBFEED_AUTH_DIR", Some("/custom/auth"))], || {
            let config = Config::default_config();
            assert_eq!(
                config.get_auth_dir().unwrap(),
                PathBuf::from("/custom/auth")
            );
        });
    }

    #[test]
    #[serial]
    fn test_config_path_precedence() {
        with_env(&[("DEBFEED_CONFIG", Some("/srv/debfeed.toml"))], || {
            assert_eq!(
                config_path(Some("/tmp/override.toml")).unwrap(),
                PathBuf::from("/tmp/override.toml")
            );
            assert_eq!(
                config_path(None).unwrap(),
                PathBuf::from("/srv/debfeed.toml")
            );
        });
        with_env(&[("DEBFEED_CONFIG", None)], || {
            assert_eq!(
                config_path(None).unwrap(),
                PathBuf::from(DEFAULT_CONFIG_PATH)
            );
        });
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default_config();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.feeds, config.feeds);
        assert_eq!(deserialized.hook, config.hook);
    }

    #[test]
    fn test_generate_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("etc/debfeed/config.toml");

        generate_default_config(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("# Package installed once every feed is configured."));

        let mut parsed: Config = toml::from_str(&written).unwrap();
        assert!(parsed.resolve().is_ok());

        assert!(matches!(
            generate_default_config(&path),
            Err(ConfigError::ConfigAlreadyExists)
        ));
    }
}
