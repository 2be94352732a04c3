pub mod annotations;
pub mod config;
pub mod error;
pub mod feed;
pub mod hook;

#[cfg(test)]
pub mod test_utils;
