//! Error types for the library layer.

use std::fmt;

use booktags_api::EmptyPool;

/// Errors raised while preparing a run: bad user input, bad configuration,
/// or a configuration file that could not be read.
///
/// Nothing inside the crawl itself produces this type; fetch and parse
/// failures are absorbed by the crawler's retry policy.
#[derive(Debug)]
pub enum BookTagsError {
    /// User-provided input failed validation.
    InvalidInput(String),
    /// A configuration value or file was rejected.
    Config(String),
    /// Reading a configuration file failed.
    Io(std::io::Error),
}

impl fmt::Display for BookTagsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for BookTagsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BookTagsError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for BookTagsError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<EmptyPool> for BookTagsError {
    fn from(e: EmptyPool) -> Self {
        Self::Config(e.to_string())
    }
}
