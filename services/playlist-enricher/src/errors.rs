//!
//! src/errors.rs
//!
//! Defines enums and methods of error conversion
//! for errors the enricher uses
//!
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl EnrichError {
    /// True when repeating the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EnrichError::Http(_) | EnrichError::RateLimited(_) | EnrichError::Io(_)
        )
    }
}

impl From<reqwest::Error> for EnrichError {
    fn from(e: reqwest::Error) -> Self { EnrichError::Http(e.to_string()) }
}

impl From<serde_json::Error> for EnrichError {
    fn from(e: serde_json::Error) -> Self { EnrichError::Parse(e.to_string()) }
}

impl From<url::ParseError> for EnrichError {
    fn from(e: url::ParseError) -> Self { EnrichError::Config(e.to_string()) }
}
