//! Repository bootstrap: trust and enable every configured feed, then install the package.

use std::path::PathBuf;

use debfeed_config::{config::Config, feed::Feed};
use debfeed_utils::system::{get_username, is_root};
use tracing::{debug, info, warn};

use crate::{
    apt::{detect_apt_version, install_package, refresh_index, AptVersion, SourceFormat},
    auth::{remove_credentials, write_credentials, Credentials},
    command::CommandRunner,
    distro::{detect, DetectSources, DistroIdentity},
    error::DebfeedError,
    keyring::{install_keyring, KeySource},
    sources::{write_source, SourceEntry},
    DebfeedResult,
};

#[derive(Clone, Debug, Default)]
pub struct BootstrapOptions {
    /// Installs this package instead of the configured one.
    pub package: Option<String>,
    /// Stops after refreshing the package index.
    pub skip_install: bool,
}

/// Directories receiving keyrings, source definitions and credentials.
#[derive(Clone, Debug)]
pub struct Layout {
    pub keyring_dir: PathBuf,
    pub sources_dir: PathBuf,
    pub auth_dir: PathBuf,
}

impl Layout {
    pub fn from_config(config: &Config) -> DebfeedResult<Self> {
        Ok(Self {
            keyring_dir: config.get_keyring_dir()?,
            sources_dir: config.get_sources_dir()?,
            auth_dir: config.get_auth_dir()?,
        })
    }
}

#[derive(Debug)]
pub struct ConfiguredFeed {
    pub name: String,
    pub keyring: PathBuf,
    pub source: PathBuf,
    pub credentials: Option<PathBuf>,
}

#[derive(Debug)]
pub struct BootstrapReport {
    pub identity: DistroIdentity,
    pub apt_version: AptVersion,
    pub feeds: Vec<ConfiguredFeed>,
    /// Package installed, `None` when installation was skipped.
    pub installed: Option<String>,
}

/// Everything a bootstrap run reads from: configuration and the two external seams.
pub struct BootstrapContext<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
    keys: &'a dyn KeySource,
}

impl<'a> BootstrapContext<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner, keys: &'a dyn KeySource) -> Self {
        Self {
            config,
            runner,
            keys,
        }
    }

    /// Detects the distribution and rejects anything outside the Debian family.
    pub fn detect_platform(&self) -> DebfeedResult<DistroIdentity> {
        let sources = DetectSources::from_config(self.config)?;
        let identity = detect(&sources, self.runner)?;

        if !identity.is_debian_family() {
            return Err(DebfeedError::UnsupportedPlatform(identity.id));
        }

        Ok(identity)
    }

    /// Installs the keyring, source definition and (for authenticated feeds) credentials of
    /// one feed, replacing whatever a previous run left behind.
    pub fn configure_feed(
        &self,
        feed: &Feed,
        identity: &DistroIdentity,
        format: SourceFormat,
        layout: &Layout,
        credentials: &Credentials,
    ) -> DebfeedResult<ConfiguredFeed> {
        info!("Configuring feed {}", feed.name);

        let keyring = install_keyring(feed, &layout.keyring_dir, self.keys, self.runner)?;
        let entry = SourceEntry::for_feed(feed, identity, keyring.clone());
        let source = write_source(&layout.sources_dir, &feed.name, &entry, format)?;

        let credentials = if feed.is_authenticated() {
            Some(write_credentials(
                &layout.auth_dir,
                &feed.name,
                &entry.uri,
                credentials,
            )?)
        } else {
            remove_credentials(&layout.auth_dir, &feed.name)?;
            None
        };

        debug!("feed {} -> {}", feed.name, source.display());
        Ok(ConfiguredFeed {
            name: feed.name.clone(),
            keyring,
            source,
            credentials,
        })
    }

    /// Runs the whole bootstrap sequence. The first failing step aborts the run; artifacts
    /// written by earlier steps are left in place.
    pub fn run(
        &self,
        credentials: &Credentials,
        options: &BootstrapOptions,
    ) -> DebfeedResult<BootstrapReport> {
        if !is_root() {
            warn!(
                "Running as {} without root privileges; writing APT configuration will likely fail",
                get_username()
            );
        }

        let identity = self.detect_platform()?;
        let apt_version = detect_apt_version(self.runner)?;
        let format = apt_version.source_format();
        info!(
            "Detected {} with APT {} ({} sources)",
            identity, apt_version, format
        );

        let layout = Layout::from_config(self.config)?;
        let mut feeds = Vec::new();
        for feed in self.config.enabled_feeds() {
            feeds.push(self.configure_feed(feed, &identity, format, &layout, credentials)?);
        }
        if feeds.is_empty() {
            warn!("No enabled feeds in configuration");
        }

        refresh_index(self.runner)?;

        let installed = if options.skip_install {
            info!("Skipping package installation");
            None
        } else {
            let package = options
                .package
                .clone()
                .unwrap_or_else(|| self.config.package.clone());
            install_package(self.runner, &package)?;
            Some(package)
        };

        Ok(BootstrapReport {
            identity,
            apt_version,
            feeds,
            installed,
        })
    }
}
