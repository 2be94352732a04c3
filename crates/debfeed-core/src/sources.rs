//! APT source definitions.

use std::path::{Path, PathBuf};

use debfeed_config::feed::Feed;
use debfeed_utils::fs::{ensure_dir_exists, safe_remove, write_file};
use tracing::debug;

use crate::{
    apt::SourceFormat,
    constants::{MANAGED_HEADER, PUBLIC_FILE_MODE},
    distro::DistroIdentity,
    DebfeedResult,
};

/// A binary (`deb`) repository entry signed by a dedicated keyring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceEntry {
    pub uri: String,
    pub suite: String,
    pub components: Vec<String>,
    pub signed_by: PathBuf,
}

impl SourceEntry {
    pub fn for_feed(feed: &Feed, identity: &DistroIdentity, signed_by: PathBuf) -> Self {
        let distro = identity.feed_distro();
        Self {
            uri: feed.repository_url(distro, &identity.codename),
            suite: feed.suite(distro, &identity.codename),
            components: feed.components(),
            signed_by,
        }
    }

    pub fn render(&self, format: SourceFormat) -> String {
        match format {
            SourceFormat::OneLine => self.render_one_line(),
            SourceFormat::Deb822 => self.render_deb822(),
        }
    }

    fn render_one_line(&self) -> String {
        format!(
            "{MANAGED_HEADER}\ndeb [signed-by={}] {} {} {}\n",
            self.signed_by.display(),
            self.uri,
            self.suite,
            self.components.join(" ")
        )
    }

    fn render_deb822(&self) -> String {
        format!(
            "{MANAGED_HEADER}\nTypes: deb\nURIs: {}\nSuites: {}\nComponents: {}\nSigned-By: {}\n",
            self.uri,
            self.suite,
            self.components.join(" "),
            self.signed_by.display()
        )
    }
}

pub fn source_path(sources_dir: &Path, feed_name: &str, format: SourceFormat) -> PathBuf {
    sources_dir.join(format!("{feed_name}.{}", format.extension()))
}

/// Removes every definition previously written for `feed_name`, in either format.
pub fn remove_stale_sources(sources_dir: &Path, feed_name: &str) -> DebfeedResult<()> {
    for format in [SourceFormat::OneLine, SourceFormat::Deb822] {
        let path = source_path(sources_dir, feed_name, format);
        if path.exists() || path.is_symlink() {
            debug!("removing stale source {}", path.display());
        }
        safe_remove(&path)?;
    }
    Ok(())
}

/// Replaces the source definition of `feed_name` with `entry` rendered as `format`.
///
/// Returns the written path.
pub fn write_source(
    sources_dir: &Path,
    feed_name: &str,
    entry: &SourceEntry,
    format: SourceFormat,
) -> DebfeedResult<PathBuf> {
    remove_stale_sources(sources_dir, feed_name)?;
    ensure_dir_exists(sources_dir)?;

    let path = source_path(sources_dir, feed_name, format);
    write_file(&path, entry.render(format).as_bytes(), Some(PUBLIC_FILE_MODE))?;

    debug!("wrote {} source {}", format, path.display());
    Ok(path)
}
