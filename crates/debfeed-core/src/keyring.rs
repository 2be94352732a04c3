//! Feed signing keys.

use std::path::{Path, PathBuf};

use debfeed_config::feed::Feed;
use debfeed_dl::{error::DownloadError, http::Http};
use debfeed_utils::fs::{ensure_dir_exists, safe_remove, write_file};
use tracing::{debug, info};

use crate::{
    command::{CommandRunner, Invocation},
    constants::{ARMOR_HEADER, PUBLIC_FILE_MODE},
    error::DebfeedError,
    DebfeedResult,
};

/// Where signing keys come from.
pub trait KeySource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

/// Downloads keys over HTTP through the shared agent.
#[derive(Default, Clone)]
pub struct HttpKeySource;

impl KeySource for HttpKeySource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        Http::fetch_bytes(url)
    }
}

pub fn keyring_path(keyring_dir: &Path, feed_name: &str) -> PathBuf {
    keyring_dir.join(format!("{feed_name}.gpg"))
}

/// Whether `key` is an ASCII-armored OpenPGP public key.
pub fn is_armored(key: &[u8]) -> bool {
    let start = key
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(key.len());
    key[start..].starts_with(ARMOR_HEADER)
}

fn dearmor<R: CommandRunner + ?Sized>(runner: &R, armored: Vec<u8>) -> Result<Vec<u8>, String> {
    let invocation = Invocation::new("gpg")
        .args(["--batch", "--yes", "--dearmor"])
        .stdin(armored);

    let output = runner
        .run(&invocation)
        .map_err(|err| format!("could not run gpg: {err}"))?;
    if !output.success() {
        return Err(format!("gpg --dearmor failed with {}", output.failure_reason()));
    }
    if output.stdout.is_empty() {
        return Err("gpg --dearmor produced no output".to_string());
    }

    Ok(output.stdout)
}

/// Fetches the key of `feed` and writes it, dearmored, to `<keyring_dir>/<feed>.gpg`.
///
/// Returns the keyring path.
pub fn install_keyring<K, R>(
    feed: &Feed,
    keyring_dir: &Path,
    keys: &K,
    runner: &R,
) -> DebfeedResult<PathBuf>
where
    K: KeySource + ?Sized,
    R: CommandRunner + ?Sized,
{
    let key_error = |reason: String| {
        DebfeedError::KeyFetch {
            feed: feed.name.clone(),
            url: feed.key_url.clone(),
            reason,
        }
    };

    info!("Fetching signing key for {}", feed.name);
    let key = keys
        .fetch(&feed.key_url)
        .map_err(|err| key_error(err.to_string()))?;

    let key = if is_armored(&key) {
        debug!("dearmoring {} byte key for {}", key.len(), feed.name);
        dearmor(runner, key).map_err(key_error)?
    } else {
        key
    };

    let path = keyring_path(keyring_dir, &feed.name);
    ensure_dir_exists(keyring_dir).map_err(|err| key_error(err.to_string()))?;
    // a link at the keyring path is replaced, not followed
    safe_remove(&path).map_err(|err| key_error(err.to_string()))?;
    write_file(&path, &key, Some(PUBLIC_FILE_MODE)).map_err(|err| key_error(err.to_string()))?;

    debug!("wrote keyring {}", path.display());
    Ok(path)
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;

    use debfeed_dl::error::DownloadError;

    use super::KeySource;

    /// Serves keys from memory; unknown URLs answer 404.
    #[derive(Default)]
    pub struct StaticKeySource {
        keys: HashMap<String, Vec<u8>>,
    }

    impl StaticKeySource {
        pub fn with(mut self, url: &str, key: &[u8]) -> Self {
            self.keys.insert(url.to_string(), key.to_vec());
            self
        }
    }

    impl KeySource for StaticKeySource {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
            self.keys.get(url).cloned().ok_or_else(|| {
                DownloadError::HttpError {
                    status: 404,
                    url: url.to_string(),
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt};

    use tempfile::TempDir;

    use super::{fake::StaticKeySource, *};
    use crate::command::fake::{failed, ok, RecordingRunner};

    const ARMORED: &[u8] =
        b"\n-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nmQINBGR...\n-----END PGP PUBLIC KEY BLOCK-----\n";
    const BINARY: &[u8] = &[0x99, 0x02, 0x0d, 0x04, 0x64];

    fn feed() -> Feed {
        Feed {
            name: "acme".to_string(),
            url: "https://apt.acme.test/{distro}".to_string(),
            key_url: "https://apt.acme.test/gpg.key".to_string(),
            suite: None,
            components: None,
            authenticated: None,
            enabled: None,
        }
    }

    #[test]
    fn test_is_armored() {
        assert!(is_armored(ARMORED));
        assert!(!is_armored(BINARY));
        assert!(!is_armored(b""));
        assert!(!is_armored(b"   "));
    }

    #[test]
    fn test_install_armored_key_is_dearmored() {
        let dir = TempDir::new().unwrap();
        let keys = StaticKeySource::default().with("https://apt.acme.test/gpg.key", ARMORED);
        let runner = RecordingRunner::new(|_| Ok(ok(BINARY)));

        let path = install_keyring(&feed(), dir.path(), &keys, &runner).unwrap();

        assert_eq!(path, dir.path().join("acme.gpg"));
        assert_eq!(fs::read(&path).unwrap(), BINARY);
        let calls = runner.calls();
        assert_eq!(calls[0].to_string(), "gpg --batch --yes --dearmor");
        assert_eq!(calls[0].stdin.as_deref(), Some(ARMORED));

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn test_install_binary_key_written_as_is() {
        let dir = TempDir::new().unwrap();
        let keyring_dir = dir.path().join("keyrings");
        let keys = StaticKeySource::default().with("https://apt.acme.test/gpg.key", BINARY);
        let runner = RecordingRunner::succeeding();

        let path = install_keyring(&feed(), &keyring_dir, &keys, &runner).unwrap();

        assert_eq!(fs::read(path).unwrap(), BINARY);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_install_replaces_planted_symlink() {
        let dir = TempDir::new().unwrap();
        let victim = dir.path().join("victim");
        fs::write(&victim, "untouched").unwrap();
        std::os::unix::fs::symlink(&victim, dir.path().join("acme.gpg")).unwrap();

        let keys = StaticKeySource::default().with("https://apt.acme.test/gpg.key", BINARY);
        let path =
            install_keyring(&feed(), dir.path(), &keys, &RecordingRunner::succeeding()).unwrap();

        assert!(!path.is_symlink());
        assert_eq!(fs::read(&path).unwrap(), BINARY);
        assert_eq!(fs::read_to_string(&victim).unwrap(), "untouched");
    }

    #[test]
    fn test_install_fetch_failure() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::succeeding();

        let err =
            install_keyring(&feed(), dir.path(), &StaticKeySource::default(), &runner).unwrap_err();

        assert!(matches!(err, DebfeedError::KeyFetch { .. }));
        assert!(err.to_string().contains("404"));
        assert!(!dir.path().join("acme.gpg").exists());
    }

    #[test]
    fn test_install_dearmor_failure() {
        let dir = TempDir::new().unwrap();
        let keys = StaticKeySource::default().with("https://apt.acme.test/gpg.key", ARMORED);
        let runner = RecordingRunner::new(|_| Ok(failed(2, "gpg: no valid OpenPGP data found.")));

        let err = install_keyring(&feed(), dir.path(), &keys, &runner).unwrap_err();

        assert!(err.to_string().contains("no valid OpenPGP data"));
        assert!(!dir.path().join("acme.gpg").exists());
    }
}
