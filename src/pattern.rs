//! URL template inference from thumbnail seeds
//!
//! A seed is one observed resource path fragment, e.g. `"016/y3v5c6xhgf/"`.
//! The template derived from it generates every candidate URL for the
//! sequence, so failing to derive one is fatal for the whole download.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The shared path structure all pages of a sequence are served under.
///
/// Immutable once derived. `shared_segment` is the path component shared by
/// every page URL; `base_directory` is its parent segment, used to build the
/// secondary URL shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlTemplate {
    /// Path shared by all pages, e.g. "016/y3v5c6xhgf"
    pub shared_segment: String,
    /// Parent directory of the shared segment, e.g. "016"
    pub base_directory: String,
}

impl UrlTemplate {
    /// Derive a template from the first seed matching the expected shape
    /// `<numeric-directory>/<alphanumeric-id>/`.
    ///
    /// Later seeds are ignored even if they differ — first-seen wins, which
    /// keeps template derivation deterministic. Returns
    /// [`Error::PatternNotFound`] when no seed matches.
    pub fn from_seeds<I, S>(seeds: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let shape = seed_shape();
        let mut seen = 0;
        for seed in seeds {
            seen += 1;
            if let Some(captures) = shape.captures(seed.as_ref()) {
                let base_directory = captures[1].to_string();
                let shared_segment = format!("{}/{}", &captures[1], &captures[2]);
                tracing::debug!(%shared_segment, %base_directory, "derived URL template");
                return Ok(Self {
                    shared_segment,
                    base_directory,
                });
            }
        }
        Err(Error::PatternNotFound { seeds_seen: seen })
    }

    /// Last path component of the shared segment, e.g. "y3v5c6xhgf".
    ///
    /// The secondary URL shape re-roots this under `base_directory`.
    pub fn shared_tail(&self) -> &str {
        self.shared_segment
            .rsplit('/')
            .next()
            .unwrap_or(&self.shared_segment)
    }
}

#[allow(clippy::expect_used)]
fn seed_shape() -> Regex {
    Regex::new(r"^(\d+)/([A-Za-z0-9]+)/?$").expect("seed shape regex is valid")
}
