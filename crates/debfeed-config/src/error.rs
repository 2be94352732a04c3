use debfeed_utils::error::{FileSystemError, PathError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(debfeed_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(debfeed_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(debfeed_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists,

    #[error("No package configured for installation")]
    #[diagnostic(
        code(debfeed_config::empty_package),
        help("Set `package` in your config file or pass --package")
    )]
    EmptyPackage,

    #[error("Invalid feed name: {0:?}")]
    #[diagnostic(
        code(debfeed_config::invalid_feed_name),
        help("Feed names may only contain lowercase letters, digits, '.', '_' and '-'")
    )]
    InvalidFeedName(String),

    #[error("Duplicate feed name: {0}")]
    #[diagnostic(
        code(debfeed_config::duplicate_feed),
        help("Each feed must have a unique name")
    )]
    DuplicateFeedName(String),

    #[error("Invalid {field} for feed '{name}': {value}")]
    #[diagnostic(
        code(debfeed_config::invalid_feed_url),
        help("Use an absolute http(s) URL")
    )]
    InvalidFeedUrl {
        name: String,
        field: &'static str,
        value: String,
    },

    #[error("More than one feed is marked as authenticated: {0}")]
    #[diagnostic(
        code(debfeed_config::multiple_authenticated),
        help("Only one feed can use the access credentials")
    )]
    MultipleAuthenticatedFeeds(String),

    #[error("Hook {0} command is empty")]
    #[diagnostic(
        code(debfeed_config::empty_command),
        help("Provide the command as a list of arguments, e.g. [\"systemctl\", \"restart\", \"agent\"]")
    )]
    EmptyCommand(&'static str),

    #[error("Hook source and destination are the same path: {0}")]
    #[diagnostic(
        code(debfeed_config::hook_self_link),
        help("Point `destination` at the path the service reads, not at the packaged file")
    )]
    HookSelfLink(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(debfeed_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(debfeed_config::path), help("Check the paths in your config file"))]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(code(debfeed_config::filesystem))]
    FileSystem(#[from] FileSystemError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(debfeed_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(debfeed_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),

    #[error("Failed to annotate first table in array: {0}")]
    #[diagnostic(code(debfeed_config::annotate_first_table))]
    AnnotateFirstTable(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
