use debfeed_config::config::Config;
use debfeed_core::{
    apt::{detect_apt_version, AptVersion, SourceFormat},
    command::SystemCommandRunner,
    distro::{self, DetectSources, DistroIdentity},
    error::DebfeedError,
    DebfeedResult,
};
use nu_ansi_term::Color::{Cyan, Green, Red};
use serde::Serialize;
use tracing::{info, warn};

use crate::utils::Colored;

#[derive(Serialize)]
struct FeedPreview {
    name: String,
    uri: String,
    suite: String,
    authenticated: bool,
}

#[derive(Serialize)]
struct DetectReport {
    identity: DistroIdentity,
    supported: bool,
    apt_version: Option<AptVersion>,
    source_format: Option<SourceFormat>,
    feeds: Vec<FeedPreview>,
}

/// Prints what a bootstrap run would use, without writing anything.
pub fn detect(config: &Config, json: bool) -> DebfeedResult<()> {
    let runner = SystemCommandRunner;
    let identity = distro::detect(&DetectSources::from_config(config)?, &runner)?;

    let apt_version = match detect_apt_version(&runner) {
        Ok(version) => Some(version),
        Err(err) => {
            warn!("{}", err);
            None
        }
    };

    let distro = identity.feed_distro().to_string();
    let feeds = config
        .enabled_feeds()
        .map(|feed| {
            FeedPreview {
                name: feed.name.clone(),
                uri: feed.repository_url(&distro, &identity.codename),
                suite: feed.suite(&distro, &identity.codename),
                authenticated: feed.is_authenticated(),
            }
        })
        .collect();

    let report = DetectReport {
        supported: identity.is_debian_family(),
        source_format: apt_version.map(|version| version.source_format()),
        apt_version,
        identity,
        feeds,
    };

    if json {
        let output = serde_json::to_string_pretty(&report)
            .map_err(|err| DebfeedError::Custom(format!("serializing report: {err}")))?;
        println!("{output}");
        return Ok(());
    }

    let supported = if report.supported {
        Colored(Green, "supported")
    } else {
        Colored(Red, "unsupported")
    };
    info!(
        "Distribution: {} ({})",
        Colored(Cyan, &report.identity),
        supported
    );
    if let (Some(version), Some(format)) = (report.apt_version, report.source_format) {
        info!("APT: {} ({} sources)", version, format);
    }
    for feed in &report.feeds {
        info!("Feed {}: {} {}", Colored(Cyan, &feed.name), feed.uri, feed.suite);
    }

    Ok(())
}
