//! APT credentials for authenticated feeds (`apt_auth.conf(5)`).

use std::{
    fmt,
    path::{Path, PathBuf},
};

use debfeed_utils::fs::{ensure_dir_exists, safe_remove, write_file};
use tracing::debug;
use url::Url;

use crate::{
    constants::{CREDENTIALS_FILE_MODE, MANAGED_HEADER},
    error::DebfeedError,
    DebfeedResult,
};

/// Access user and token passed to `debfeed bootstrap`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub token: String,
}

impl Credentials {
    /// Rejects empty values and values containing whitespace, which `auth.conf` cannot express.
    pub fn new(user: &str, token: &str) -> DebfeedResult<Self> {
        for (name, value) in [("access_user", user), ("access_token", token)] {
            if value.trim().is_empty() {
                return Err(DebfeedError::InvalidArguments(format!(
                    "{name} must not be empty"
                )));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(DebfeedError::InvalidArguments(format!(
                    "{name} must not contain whitespace"
                )));
            }
        }

        Ok(Self {
            user: user.to_string(),
            token: token.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// `machine` value for a repository URL: host, optional port and path prefix, no scheme.
pub fn machine_for(repository_url: &str) -> DebfeedResult<String> {
    let url = Url::parse(repository_url).map_err(|err| {
        DebfeedError::InvalidArguments(format!("invalid feed URL '{repository_url}': {err}"))
    })?;
    let host = url.host_str().ok_or_else(|| {
        DebfeedError::InvalidArguments(format!("feed URL '{repository_url}' has no host"))
    })?;

    let mut machine = host.to_string();
    if let Some(port) = url.port() {
        machine.push_str(&format!(":{port}"));
    }
    machine.push_str(url.path().trim_end_matches('/'));

    Ok(machine)
}

pub fn render(machine: &str, credentials: &Credentials) -> String {
    format!(
        "{MANAGED_HEADER}\nmachine {machine} login {} password {}\n",
        credentials.user, credentials.token
    )
}

pub fn credentials_path(auth_dir: &Path, feed_name: &str) -> PathBuf {
    auth_dir.join(format!("{feed_name}.conf"))
}

/// Writes `<auth_dir>/<feed>.conf` readable by the owner only, replacing any previous file.
pub fn write_credentials(
    auth_dir: &Path,
    feed_name: &str,
    repository_url: &str,
    credentials: &Credentials,
) -> DebfeedResult<PathBuf> {
    let machine = machine_for(repository_url)?;
    let path = credentials_path(auth_dir, feed_name);

    ensure_dir_exists(auth_dir)?;
    // never write through a symlink planted at the credentials path
    safe_remove(&path)?;
    write_file(
        &path,
        render(&machine, credentials).as_bytes(),
        Some(CREDENTIALS_FILE_MODE),
    )?;

    debug!("wrote credentials for {} to {}", machine, path.display());
    Ok(path)
}

/// Drops credentials left behind by a feed that no longer requires them.
pub fn remove_credentials(auth_dir: &Path, feed_name: &str) -> DebfeedResult<()> {
    let path = credentials_path(auth_dir, feed_name);
    if path.exists() {
        debug!("removing stale credentials {}", path.display());
    }
    safe_remove(&path)?;
    Ok(())
}
