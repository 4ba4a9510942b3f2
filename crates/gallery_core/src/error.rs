//! Error types for the gallery core.

use std::time::Duration;
use thiserror::Error;

/// Failure to produce a decoded image for one asset URL.
///
/// Never fatal: callers fall back to a placeholder material. `Clone` so every
/// coalesced waiter observes the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request for {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode image from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// The fetch task went away without reporting (runtime shutdown or panic).
    #[error("fetch of {url} was abandoned")]
    Abandoned { url: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Request { url, .. }
            | Self::Status { url, .. }
            | Self::Decode { url, .. }
            | Self::Abandoned { url } => url,
        }
    }
}

/// Invalid gallery configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("tile count must be at least 2, got {0}")]
    TooFewTiles(usize),

    #[error("sphere radius must be positive and finite, got {0}")]
    InvalidRadius(f32),

    #[error("asset pool must contain at least one asset")]
    EmptyAssetPool,

    #[error("{name} duration must be non-zero")]
    ZeroDuration { name: &'static str },

    #[error("{name} must be positive and finite, got {value}")]
    InvalidScale { name: &'static str, value: f32 },

    #[error("fetch timeout must be non-zero, got {0:?}")]
    InvalidTimeout(Duration),
}
