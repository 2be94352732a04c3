//! Error types for debfeed-core.

use std::{error::Error, path::PathBuf};

use debfeed_config::error::ConfigError;
use debfeed_utils::error::{FileSystemError, PathError};
use miette::Diagnostic;
use thiserror::Error;

/// Core error type for bootstrap and post-install operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DebfeedError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(
        code(debfeed::filesystem),
        help("Check file permissions; most writes need root")
    )]
    FileSystemError(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(code(debfeed::path), help("Check the configured paths"))]
    PathError(#[from] PathError),

    #[error("Error while {action}")]
    #[diagnostic(code(debfeed::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not detect the distribution: {0}")]
    #[diagnostic(
        code(debfeed::detection),
        help("Make sure /etc/os-release or /etc/lsb-release exists, or install lsb-release")
    )]
    Detection(String),

    #[error("Failed to install the key for feed '{feed}' from {url}: {reason}")]
    #[diagnostic(
        code(debfeed::key_fetch),
        help("Check your internet connection, the feed's key_url and that gpg is installed")
    )]
    KeyFetch {
        feed: String,
        url: String,
        reason: String,
    },

    #[error("Unsupported platform '{0}'")]
    #[diagnostic(
        code(debfeed::unsupported_platform),
        help("Only Debian and Ubuntu (or derivatives declaring them in ID_LIKE) are supported")
    )]
    UnsupportedPlatform(String),

    #[error("{action} failed: {reason}")]
    #[diagnostic(
        code(debfeed::install),
        help("Run the apt-get command manually to see the full output")
    )]
    Install { action: String, reason: String },

    #[error("Configuration '{}' was rejected by the validator: {reason}", path.display())]
    #[diagnostic(
        code(debfeed::config_validation),
        help("The invalid configuration is linked in place; fix it and rerun the hook")
    )]
    ConfigValidation { path: PathBuf, reason: String },

    #[error("'{command}' failed: {reason}")]
    #[diagnostic(code(debfeed::command))]
    Command { command: String, reason: String },

    #[error("Invalid arguments: {0}")]
    #[diagnostic(
        code(debfeed::invalid_arguments),
        help("Usage: debfeed bootstrap <access_user> <access_token>")
    )]
    InvalidArguments(String),

    #[error("{0}")]
    #[diagnostic(code(debfeed::error))]
    Custom(String),
}

impl DebfeedError {
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn root_cause(&self) -> String {
        let mut cause: &dyn Error = self;
        while let Some(source) = cause.source() {
            cause = source;
        }
        cause.to_string()
    }
}

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, DebfeedError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, DebfeedError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            DebfeedError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
