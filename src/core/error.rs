//! Failure taxonomy for marketplace API calls

use std::time::Duration;

/// Why a call against the marketplace API produced no usable value.
///
/// Covers all three endpoints. A failure listing sites is fatal to an
/// aggregation; any other failure only drops the affected site.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Request error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP error: {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse JSON response for {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Site {site_id} did not resolve within {after:?}")]
    Timeout { site_id: String, after: Duration },

    #[error("Resolver for site {site_id} stopped without reporting")]
    Aborted { site_id: String },
}

impl FetchError {
    pub fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub fn decode(url: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
