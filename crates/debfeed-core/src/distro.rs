//! Distribution detection from OS metadata.

use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use debfeed_config::config::Config;
use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    command::{CommandRunner, Invocation},
    constants::DEBIAN_FAMILY,
    error::DebfeedError,
    DebfeedResult,
};

/// Identity of the running distribution. All values are lowercase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DistroIdentity {
    pub id: String,
    pub codename: String,
    pub id_like: Vec<String>,
}

impl DistroIdentity {
    pub fn is_debian_family(&self) -> bool {
        in_debian_family(&self.id, &self.id_like)
    }

    /// Distribution name used for feed URLs.
    ///
    /// Derivatives (Linux Mint, Pop!_OS, ...) map to the first Debian-family entry of `ID_LIKE`,
    /// since feeds only publish for `debian` and `ubuntu`.
    pub fn feed_distro(&self) -> &str {
        if DEBIAN_FAMILY.contains(&self.id.as_str()) {
            return &self.id;
        }
        self.id_like
            .iter()
            .find(|like| DEBIAN_FAMILY.contains(&like.as_str()))
            .map(String::as_str)
            .unwrap_or(&self.id)
    }
}

impl fmt::Display for DistroIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.codename)
    }
}

fn in_debian_family(id: &str, id_like: &[String]) -> bool {
    DEBIAN_FAMILY.contains(&id)
        || id_like
            .iter()
            .any(|like| DEBIAN_FAMILY.contains(&like.as_str()))
}

/// Files consulted during detection, in priority order.
#[derive(Clone, Debug)]
pub struct DetectSources {
    pub os_release: PathBuf,
    pub lsb_release: PathBuf,
}

impl DetectSources {
    pub fn from_config(config: &Config) -> DebfeedResult<Self> {
        Ok(Self {
            os_release: config.get_os_release_path()?,
            lsb_release: config.get_lsb_release_path()?,
        })
    }
}

#[derive(Debug, Default)]
struct PartialIdentity {
    id: Option<String>,
    codename: Option<String>,
    id_like: Vec<String>,
}

impl PartialIdentity {
    /// Fills fields still missing from `other`.
    fn merge(&mut self, other: PartialIdentity) {
        if self.id.is_none() {
            self.id = other.id;
        }
        if self.codename.is_none() {
            self.codename = other.codename;
        }
        if self.id_like.is_empty() {
            self.id_like = other.id_like;
        }
    }

    fn is_complete(&self) -> bool {
        self.id.is_some() && self.codename.is_some()
    }
}

/// Parses a shell-style `KEY=value` file such as os-release or lsb-release.
///
/// Blank lines and comments are skipped. Values lose one level of surrounding quotes.
pub fn parse_release_file(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), unquote(value.trim()).to_string()))
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn normalize(value: Option<&String>) -> Option<String> {
    value
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
}

/// `12 (bookworm)` → `bookworm`, `22.04.3 LTS (Jammy Jellyfish)` → `jammy`.
fn codename_from_version(version: &str) -> Option<String> {
    let start = version.find('(')?;
    let end = version[start..].find(')')? + start;
    version[start + 1..end]
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
}

fn from_os_release(fields: &HashMap<String, String>) -> PartialIdentity {
    let id = normalize(fields.get("ID"));
    let id_like: Vec<String> = fields
        .get("ID_LIKE")
        .map(|like| like.split_whitespace().map(str::to_lowercase).collect())
        .unwrap_or_default();

    let version_codename = normalize(fields.get("VERSION_CODENAME"));
    let ubuntu_codename = normalize(fields.get("UBUNTU_CODENAME"));
    let is_ubuntu_derivative = id.as_deref() != Some("ubuntu")
        && id_like.iter().any(|like| like == "ubuntu");

    // derivatives carry their own VERSION_CODENAME, feeds only know the Ubuntu one
    let codename = if is_ubuntu_derivative && ubuntu_codename.is_some() {
        ubuntu_codename
    } else {
        version_codename
            .or(ubuntu_codename)
            .or_else(|| fields.get("VERSION").and_then(|v| codename_from_version(v)))
    };

    PartialIdentity {
        id,
        codename,
        id_like,
    }
}

fn from_lsb_release(fields: &HashMap<String, String>) -> PartialIdentity {
    PartialIdentity {
        id: normalize(fields.get("DISTRIB_ID")),
        codename: normalize(fields.get("DISTRIB_CODENAME")),
        id_like: Vec::new(),
    }
}

fn read_release_file(path: &Path) -> Option<HashMap<String, String>> {
    match fs::read_to_string(path) {
        Ok(content) => Some(parse_release_file(&content)),
        Err(err) => {
            debug!("skipping {}: {}", path.display(), err);
            None
        }
    }
}

fn query_lsb_release<R: CommandRunner + ?Sized>(runner: &R, flag: &str) -> Option<String> {
    let invocation = Invocation::new("lsb_release").arg(flag);
    match runner.run(&invocation) {
        Ok(output) if output.success() => {
            let value = output.stdout_lossy();
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_lowercase())
        }
        Ok(output) => {
            debug!("{} failed: {}", invocation, output.failure_reason());
            None
        }
        Err(err) => {
            debug!("{} unavailable: {}", invocation, err);
            None
        }
    }
}

/// Detects the running distribution.
///
/// Sources are consulted in order (os-release, lsb-release, the `lsb_release` command) and
/// each field is taken from the first source that provides it. Later sources are skipped once
/// both id and codename are known.
///
/// A host whose id is known but outside the Debian family fails with
/// [`DebfeedError::UnsupportedPlatform`] even without a codename.
pub fn detect<R: CommandRunner + ?Sized>(
    sources: &DetectSources,
    runner: &R,
) -> DebfeedResult<DistroIdentity> {
    let mut identity = PartialIdentity::default();

    if let Some(fields) = read_release_file(&sources.os_release) {
        identity.merge(from_os_release(&fields));
        trace!("after {}: {:?}", sources.os_release.display(), identity);
    }

    if !identity.is_complete() {
        if let Some(fields) = read_release_file(&sources.lsb_release) {
            identity.merge(from_lsb_release(&fields));
            trace!("after {}: {:?}", sources.lsb_release.display(), identity);
        }
    }

    if !identity.is_complete() {
        let from_command = PartialIdentity {
            id: identity
                .id
                .is_none()
                .then(|| query_lsb_release(runner, "-si"))
                .flatten(),
            codename: identity
                .codename
                .is_none()
                .then(|| query_lsb_release(runner, "-sc"))
                .flatten(),
            id_like: Vec::new(),
        };
        identity.merge(from_command);
    }

    if let (Some(id), None) = (&identity.id, &identity.codename) {
        if !in_debian_family(id, &identity.id_like) {
            return Err(DebfeedError::UnsupportedPlatform(id.clone()));
        }
    }

    let missing = match (&identity.id, &identity.codename) {
        (Some(_), Some(_)) => None,
        (None, Some(_)) => Some("distribution id"),
        (Some(_), None) => Some("release codename"),
        (None, None) => Some("distribution id and release codename"),
    };

    match (identity.id, identity.codename) {
        (Some(id), Some(codename)) => {
            let identity = DistroIdentity {
                id,
                codename,
                id_like: identity.id_like,
            };
            debug!("detected distribution {}", identity);
            Ok(identity)
        }
        _ => {
            Err(DebfeedError::Detection(format!(
                "no {} found in {}, {} or lsb_release",
                missing.unwrap_or("identity"),
                sources.os_release.display(),
                sources.lsb_release.display()
            )))
        }
    }
}
