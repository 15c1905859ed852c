//! Error types for gallery-dl
//!
//! The taxonomy follows the propagation policy of the download pipeline:
//! only [`Error::PatternNotFound`] and [`Error::NothingToAssemble`] abort
//! their stage. Everything that can go wrong for a *single* page (a probe
//! that times out, a fetch that returns a bad status) is captured as data
//! (`PageFailure`) and surfaced in the final report instead of being raised.

use thiserror::Error;

/// Result type alias for gallery-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gallery-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "miss_threshold")
        key: Option<String>,
    },

    /// No seed matched the expected resource-path shape, so no URL template
    /// could be derived. Fatal for the whole sequence.
    #[error("no recognizable image pattern in {seeds_seen} seed(s)")]
    PatternNotFound {
        /// Number of seed strings that were examined
        seeds_seen: usize,
    },

    /// The fetch run produced zero successful pages, so there is nothing to
    /// write. Fatal for the assembly step only; discovery and fetch results
    /// are still returned to the caller.
    #[error("no pages were fetched successfully, nothing to assemble")]
    NothingToAssemble,

    /// The given URL does not identify a gallery
    #[error("could not extract gallery id from URL: {0}")]
    InvalidGalleryUrl(String),

    /// Network error (gallery page fetch, after retries are exhausted)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CBZ archive writing error
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}
