use std::{env, path::PathBuf};

use crate::{
    error::{PathError, PathResult},
    system::get_username,
};

/// `$HOME`, or `/home/<user>` when it is unset or empty.
pub fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/home").join(get_username()))
}

/// `$XDG_STATE_HOME`, defaulting to `~/.local/state`.
pub fn xdg_state_home() -> PathBuf {
    env::var_os("XDG_STATE_HOME")
        .filter(|state| !state.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".local/state"))
}

/// Expands a leading `~`, `$VAR` and `${VAR}` in `path`, then makes it absolute against the
/// working directory.
///
/// `$HOME` and `$XDG_STATE_HOME` get the same defaults as [`home_dir`] and [`xdg_state_home`].
/// A `$` not followed by a variable name is kept as is.
///
/// # Errors
///
/// * [`PathError::Empty`] if the path is blank
/// * [`PathError::UnsetVariable`] if a referenced variable is not set
/// * [`PathError::UnterminatedVariable`] if `${` has no closing brace
/// * [`PathError::CurrentDir`] if a relative path cannot be anchored
///
/// # Example
///
/// ```
/// use debfeed_utils::path::resolve_path;
///
/// let keyrings = resolve_path("/usr/share/keyrings").unwrap();
/// assert_eq!(keyrings.to_str(), Some("/usr/share/keyrings"));
/// ```
pub fn resolve_path(path: &str) -> PathResult<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let expanded = PathBuf::from(expand(path)?);
    if expanded.is_absolute() {
        return Ok(expanded);
    }

    let cwd = env::current_dir().map_err(PathError::CurrentDir)?;
    Ok(cwd.join(expanded))
}

fn lookup(name: &str, path: &str) -> PathResult<String> {
    match name {
        "HOME" => Ok(home_dir().to_string_lossy().into_owned()),
        "XDG_STATE_HOME" => Ok(xdg_state_home().to_string_lossy().into_owned()),
        _ => {
            env::var(name).map_err(|_| {
                PathError::UnsetVariable {
                    name: name.to_string(),
                    path: path.to_string(),
                }
            })
        }
    }
}

fn expand(path: &str) -> PathResult<String> {
    let (mut out, mut rest) = match path.strip_prefix('~') {
        Some(tail) if tail.is_empty() || tail.starts_with('/') => {
            (home_dir().to_string_lossy().into_owned(), tail)
        }
        _ => (String::with_capacity(path.len()), path),
    };

    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            let end = braced.find('}').ok_or_else(|| {
                PathError::UnterminatedVariable {
                    path: path.to_string(),
                }
            })?;
            out.push_str(&lookup(&braced[..end], path)?);
            rest = &braced[end + 1..];
        } else {
            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if len == 0 {
                out.push('$');
            } else {
                out.push_str(&lookup(&after[..len], path)?);
            }
            rest = &after[len..];
        }
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    /// Runs `f` with `key` set (or unset), restoring the previous value afterwards.
    fn with_var<F: FnOnce()>(key: &str, value: Option<&str>, f: F) {
        let previous = env::var_os(key);
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
        f();
        match previous {
            Some(previous) => env::set_var(key, previous),
            None => env::remove_var(key),
        }
    }

    #[test]
    #[serial]
    fn test_expand_plain_and_braced_variables() {
        with_var("DEBFEED_TEST_DIR", Some("keyrings"), || {
            assert_eq!(expand("/usr/share/$DEBFEED_TEST_DIR").unwrap(), "/usr/share/keyrings");
            assert_eq!(
                expand("/usr/share/${DEBFEED_TEST_DIR}/acme.gpg").unwrap(),
                "/usr/share/keyrings/acme.gpg"
            );
            assert_eq!(
                expand("/x/$DEBFEED_TEST_DIR.d").unwrap(),
                "/x/keyrings.d"
            );
        });
    }

    #[test]
    #[serial]
    fn test_expand_unset_variable() {
        with_var("DEBFEED_TEST_MISSING", None, || {
            let err = expand("$DEBFEED_TEST_MISSING/x").unwrap_err();
            assert!(matches!(
                err,
                PathError::UnsetVariable { ref name, .. } if name == "DEBFEED_TEST_MISSING"
            ));
        });
    }

    #[test]
    fn test_expand_unterminated_brace() {
        assert!(matches!(
            expand("${UNCLOSED"),
            Err(PathError::UnterminatedVariable { .. })
        ));
    }

    #[test]
    fn test_lone_dollar_is_kept() {
        assert_eq!(expand("/tmp/$/x$").unwrap(), "/tmp/$/x$");
    }

    #[test]
    #[serial]
    fn test_tilde_expansion() {
        with_var("HOME", Some("/home/operator"), || {
            assert_eq!(
                resolve_path("~/.local/state/debfeed").unwrap(),
                PathBuf::from("/home/operator/.local/state/debfeed")
            );
            assert_eq!(expand("~").unwrap(), "/home/operator");
            assert_eq!(expand("/srv/~user").unwrap(), "/srv/~user");
        });
    }

    #[test]
    fn test_resolve_blank_path() {
        assert!(matches!(resolve_path("   "), Err(PathError::Empty)));
    }

    #[test]
    fn test_resolve_relative_path() {
        let resolved = resolve_path("relative/file").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("relative/file"));
    }

    #[test]
    #[serial]
    fn test_xdg_state_home() {
        with_var("HOME", Some("/home/operator"), || {
            with_var("XDG_STATE_HOME", None, || {
                assert_eq!(xdg_state_home(), PathBuf::from("/home/operator/.local/state"));
            });
            with_var("XDG_STATE_HOME", Some("/var/lib/state"), || {
                assert_eq!(xdg_state_home(), PathBuf::from("/var/lib/state"));
            });
        });
    }
}
