use error::DebfeedError;

pub mod apt;
pub mod auth;
pub mod bootstrap;
pub mod command;
pub mod constants;
pub mod distro;
pub mod error;
pub mod hook;
pub mod keyring;
pub mod sources;
pub mod utils;

pub type DebfeedResult<T> = std::result::Result<T, DebfeedError>;
