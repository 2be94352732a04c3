use nix::unistd::{geteuid, User};

/// Returns true when the process runs with an effective uid of 0.
pub fn is_root() -> bool {
    geteuid().is_root()
}

/// Returns the name of the user owning the current process.
///
/// Falls back to the `USER` environment variable, then to the numeric uid, when the passwd
/// database has no entry for the effective uid.
pub fn get_username() -> String {
    let uid = geteuid();
    match User::from_uid(uid) {
        Ok(Some(user)) => user.name,
        _ => std::env::var("USER").unwrap_or_else(|_| uid.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_username_not_empty() {
        assert!(!get_username().is_empty());
    }

    #[test]
    fn test_is_root_matches_uid() {
        assert_eq!(is_root(), geteuid().as_raw() == 0);
    }
}
