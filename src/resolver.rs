//! Candidate URL enumeration and per-index resolution
//!
//! Page URLs are not advertised anywhere; they are guessed. For a given
//! index the real URL is found by probing a fixed cross-product of
//! {mirror × format × shape × scheme} candidates in order and taking the
//! first that answers. The cross-product is produced lazily so resolution
//! short-circuits without materializing the full candidate list.

use crate::client::Transport;
use crate::pattern::UrlTemplate;
use crate::types::{ImageFormat, Mirror, ResolvedPage};
use std::sync::Arc;

/// The two URL shapes mirrors serve pages under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlShape {
    /// `host/<shared-segment>/<index><ext>`
    Primary,
    /// `host/<base-directory>/<shared-tail>/<index><ext>`
    Secondary,
}

/// Transport schemes, tried http first.
const SCHEMES: [&str; 2] = ["http", "https"];

/// Shapes, primary first.
const SHAPES: [UrlShape; 2] = [UrlShape::Primary, UrlShape::Secondary];

/// One guessable URL for a page index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// The full URL to probe
    pub url: String,
    /// Mirror the URL points at
    pub mirror: Mirror,
    /// Image format of the URL
    pub format: ImageFormat,
}

/// Lazy iterator over every candidate URL for one index.
///
/// Enumeration order is fixed and significant: mirror (preference order) →
/// format (jpg, png, webp) → shape (primary, secondary) → scheme (http,
/// https). Finite and restartable per call — build a fresh one for each
/// index.
pub struct Candidates<'a> {
    template: &'a UrlTemplate,
    host_pattern: &'a str,
    mirrors: &'a [Mirror],
    index: u32,
    pos: usize,
}

impl<'a> Candidates<'a> {
    /// Candidates for `index` over the given mirror slice.
    pub fn new(
        template: &'a UrlTemplate,
        host_pattern: &'a str,
        mirrors: &'a [Mirror],
        index: u32,
    ) -> Self {
        Self {
            template,
            host_pattern,
            mirrors,
            index,
            pos: 0,
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        let per_mirror = ImageFormat::PROBE_ORDER.len() * SHAPES.len() * SCHEMES.len();
        if self.pos >= self.mirrors.len() * per_mirror {
            return None;
        }

        let mirror = self.mirrors[self.pos / per_mirror];
        let rem = self.pos % per_mirror;
        let format = ImageFormat::PROBE_ORDER[rem / (SHAPES.len() * SCHEMES.len())];
        let shape = SHAPES[(rem / SCHEMES.len()) % SHAPES.len()];
        let scheme = SCHEMES[rem % SCHEMES.len()];
        self.pos += 1;

        let host = mirror.host(self.host_pattern);
        let ext = format.extension();
        let url = match shape {
            UrlShape::Primary => format!(
                "{scheme}://{host}/{}/{}{ext}",
                self.template.shared_segment, self.index
            ),
            UrlShape::Secondary => format!(
                "{scheme}://{host}/{}/{}/{}{ext}",
                self.template.base_directory,
                self.template.shared_tail(),
                self.index
            ),
        };

        Some(Candidate {
            url,
            mirror,
            format,
        })
    }
}

/// Resolves page indices to concrete URLs by probing candidates in order.
pub struct UrlResolver {
    transport: Arc<dyn Transport>,
    template: UrlTemplate,
    host_pattern: String,
}

impl UrlResolver {
    /// Build a resolver for one sequence.
    pub fn new(transport: Arc<dyn Transport>, template: UrlTemplate, host_pattern: String) -> Self {
        Self {
            transport,
            template,
            host_pattern,
        }
    }

    /// The template this resolver enumerates from.
    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    /// Find the real URL for `index` over the given mirrors.
    ///
    /// Probes candidates in enumeration order and returns the first that
    /// exists. A probe transport failure counts as "does not exist" for that
    /// candidate; the next candidate substitutes for a retry. `None` means
    /// the whole enumeration was exhausted.
    pub async fn resolve(&self, index: u32, mirrors: &[Mirror]) -> Option<ResolvedPage> {
        for candidate in Candidates::new(&self.template, &self.host_pattern, mirrors, index) {
            if self.transport.probe_exists(&candidate.url).await {
                tracing::debug!(index, url = %candidate.url, mirror = %candidate.mirror, "resolved page");
                return Some(ResolvedPage {
                    index,
                    url: candidate.url,
                    mirror: candidate.mirror,
                    format: candidate.format,
                });
            }
        }
        tracing::debug!(index, "no candidate resolved");
        None
    }
}
