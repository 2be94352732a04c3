use std::{fmt, str::FromStr};

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    command::{CommandRunner, Invocation},
    error::DebfeedError,
    DebfeedResult,
};

/// On-disk syntax of an APT source definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// `deb [options] uri suite components` in a `.list` file.
    OneLine,
    /// RFC822-style stanza in a `.sources` file.
    Deb822,
}

impl SourceFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SourceFormat::OneLine => "list",
            SourceFormat::Deb822 => "sources",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::OneLine => write!(f, "one-line"),
            SourceFormat::Deb822 => write!(f, "deb822"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct AptVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl AptVersion {
    /// DEB822 for 2.0 and later, and for the 1.8/1.9 series that already read `.sources`.
    pub fn source_format(&self) -> SourceFormat {
        if self.major >= 2 || (self.major == 1 && matches!(self.minor, 8 | 9)) {
            SourceFormat::Deb822
        } else {
            SourceFormat::OneLine
        }
    }

    /// Extracts the version from `apt-get --version` output (`apt 2.4.8 (amd64)`).
    pub fn from_version_output(output: &str) -> Option<Self> {
        let first_line = output.lines().next()?;
        let mut words = first_line.split_whitespace();
        if words.next()? != "apt" {
            return None;
        }
        words.next()?.parse().ok()
    }
}

impl FromStr for AptVersion {
    type Err = String;

    /// Parses `major[.minor[.patch]]`, ignoring distribution suffixes such as `ubuntu0.1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let leading_number = |part: &str| -> Option<u32> {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        };

        let mut parts = s.trim().split(['.', '~', '+']);
        let major = parts
            .next()
            .and_then(leading_number)
            .ok_or_else(|| format!("invalid APT version '{s}'"))?;
        let minor = parts.next().and_then(leading_number).unwrap_or(0);
        let patch = parts.next().and_then(leading_number).unwrap_or(0);

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for AptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn run_apt<R: CommandRunner + ?Sized>(
    runner: &R,
    action: &str,
    invocation: Invocation,
) -> DebfeedResult<Vec<u8>> {
    let output = runner.run(&invocation).map_err(|err| {
        DebfeedError::Install {
            action: action.to_string(),
            reason: format!("could not run '{invocation}': {err}"),
        }
    })?;

    if !output.success() {
        return Err(DebfeedError::Install {
            action: action.to_string(),
            reason: output.failure_reason(),
        });
    }

    Ok(output.stdout)
}

/// Queries the installed APT version.
pub fn detect_apt_version<R: CommandRunner + ?Sized>(runner: &R) -> DebfeedResult<AptVersion> {
    let stdout = run_apt(
        runner,
        "Querying the APT version",
        Invocation::new("apt-get").arg("--version"),
    )?;
    let stdout = String::from_utf8_lossy(&stdout);

    let version = AptVersion::from_version_output(&stdout).ok_or_else(|| {
        DebfeedError::Install {
            action: "Querying the APT version".to_string(),
            reason: format!(
                "unrecognised output '{}'",
                stdout.lines().next().unwrap_or_default()
            ),
        }
    })?;

    debug!("APT {} uses {} sources", version, version.source_format());
    Ok(version)
}

/// Runs `apt-get update`.
pub fn refresh_index<R: CommandRunner + ?Sized>(runner: &R) -> DebfeedResult<()> {
    info!("Refreshing package index");
    run_apt(
        runner,
        "Refreshing the package index",
        Invocation::new("apt-get")
            .arg("update")
            .env("DEBIAN_FRONTEND", "noninteractive")
            .passthrough(),
    )?;
    Ok(())
}

/// Runs `apt-get install -y <package>` without prompts.
pub fn install_package<R: CommandRunner + ?Sized>(runner: &R, package: &str) -> DebfeedResult<()> {
    info!("Installing {}", package);
    run_apt(
        runner,
        &format!("Installing {package}"),
        Invocation::new("apt-get")
            .args(["install", "-y", package])
            .env("DEBIAN_FRONTEND", "noninteractive")
            .passthrough(),
    )?;
    Ok(())
}
