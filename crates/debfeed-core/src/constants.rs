//! Constants used throughout debfeed-core.

/// Permission bits for keyrings and source definitions.
pub const PUBLIC_FILE_MODE: u32 = 0o644;

/// Permission bits for APT credentials files.
pub const CREDENTIALS_FILE_MODE: u32 = 0o600;

/// Suffix appended to a replaced configuration file.
pub const BACKUP_SUFFIX: &str = ".bak";

/// First line of every file debfeed writes and later overwrites.
pub const MANAGED_HEADER: &str = "# Managed by debfeed. Local changes are overwritten.";

/// Header of an ASCII-armored OpenPGP public key.
pub const ARMOR_HEADER: &[u8] = b"-----BEGIN PGP PUBLIC KEY BLOCK-----";

/// Distribution ids (or `ID_LIKE` entries) accepted as Debian family.
pub const DEBIAN_FAMILY: &[&str] = &["debian", "ubuntu"];
