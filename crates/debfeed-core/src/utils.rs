use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::{constants::BACKUP_SUFFIX, DebfeedResult};

/// Runs a step whose failure must not abort the caller; the error is logged at warn level.
pub fn best_effort<T>(what: &str, result: DebfeedResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("{} failed (ignored): {}", what, err);
            None
        }
    }
}

/// `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}
