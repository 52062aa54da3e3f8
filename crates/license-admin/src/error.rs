//! Error types for license-admin

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building an [`crate::AdminClient`].
///
/// Calls themselves never fail; see [`license_types::ApiCallResult`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid admin secret: {0}")]
    InvalidSecret(#[from] reqwest::header::InvalidHeaderValue),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
