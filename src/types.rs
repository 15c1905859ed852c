//! Core types and events for gallery-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One of the fixed set of image mirror hosts.
///
/// Mirrors are tried in declaration order (`I1` first). The ordering is a
/// fixed preference, nothing more — all mirrors are believed to serve
/// identical content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mirror {
    /// First mirror (i1)
    I1,
    /// Second mirror (i2)
    I2,
    /// Third mirror (i3)
    I3,
    /// Fourth mirror (i4)
    I4,
    /// Fifth mirror (i5)
    I5,
    /// Sixth mirror (i6)
    I6,
}

impl Mirror {
    /// All mirrors in preference order
    pub const ALL: [Mirror; 6] = [
        Mirror::I1,
        Mirror::I2,
        Mirror::I3,
        Mirror::I4,
        Mirror::I5,
        Mirror::I6,
    ];

    /// Mirror number, 1-based
    pub fn number(&self) -> u8 {
        match self {
            Mirror::I1 => 1,
            Mirror::I2 => 2,
            Mirror::I3 => 3,
            Mirror::I4 => 4,
            Mirror::I5 => 5,
            Mirror::I6 => 6,
        }
    }

    /// Render the host for this mirror from a host pattern.
    ///
    /// Every occurrence of `{n}` in the pattern is replaced with the mirror
    /// number, so `"i{n}.nhentaimg.com"` becomes `"i3.nhentaimg.com"` for
    /// [`Mirror::I3`]. A pattern without `{n}` maps all mirrors to the same
    /// host, which is how tests point the whole mirror set at one server.
    pub fn host(&self, host_pattern: &str) -> String {
        host_pattern.replace("{n}", &self.number().to_string())
    }
}

impl std::fmt::Display for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}", self.number())
    }
}

/// Image file format tried during URL resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG (.jpg) — tried first
    Jpg,
    /// PNG (.png)
    Png,
    /// WebP (.webp) — tried last
    Webp,
}

impl ImageFormat {
    /// Probe order: jpg, then png, then webp
    pub const PROBE_ORDER: [ImageFormat; 3] = [ImageFormat::Jpg, ImageFormat::Png, ImageFormat::Webp];

    /// File extension including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpg => ".jpg",
            ImageFormat::Png => ".png",
            ImageFormat::Webp => ".webp",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension().trim_start_matches('.'))
    }
}

/// A page index whose real URL has been resolved by probing.
///
/// Created once by the resolver on the first successful probe for that index
/// and never mutated afterwards. The index is unique within a sequence and
/// corresponds 1:1 with the page's position in the assembled artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPage {
    /// 1-based page index within the sequence
    pub index: u32,
    /// The resolved URL that answered the existence probe
    pub url: String,
    /// Mirror that served the probe
    pub mirror: Mirror,
    /// Image format of the resolved URL
    pub format: ImageFormat,
}

/// Result of sequence discovery: the ordered index → page mapping plus where
/// the scan stopped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceMap {
    /// Resolved pages keyed by index (ascending)
    pub pages: BTreeMap<u32, ResolvedPage>,
    /// First index at or beyond which nothing was resolved (exclusive bound
    /// of the scanned range)
    pub end_index: u32,
}

impl SequenceMap {
    /// Number of resolved pages
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True if no page was resolved
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// A successfully fetched page payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageSuccess {
    /// 1-based page index
    pub index: u32,
    /// Full image payload
    pub bytes: Vec<u8>,
    /// Image format, used to name the artifact entry
    pub format: ImageFormat,
}

/// A page whose fetch failed. Failures are final for the run; the pipeline
/// never retries them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    /// 1-based page index
    pub index: u32,
    /// Human-readable failure reason
    pub reason: String,
}

/// Outcome of one fetch run. Every resolved index appears in exactly one of
/// the two collections.
#[derive(Clone, Debug, Default)]
pub struct FetchReport {
    /// Successful page payloads keyed by index (ascending)
    pub successes: BTreeMap<u32, PageSuccess>,
    /// Failed pages, in completion order
    pub failures: Vec<PageFailure>,
}

impl FetchReport {
    /// Sorted indices that were resolved but not fetched
    pub fn missing_indices(&self) -> Vec<u32> {
        let mut missing: Vec<u32> = self.failures.iter().map(|f| f.index).collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }
}

/// Event emitted during the download lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Sequence discovery started for a gallery
    DiscoveryStarted {
        /// Gallery identifier
        gallery_id: String,
    },

    /// A page index was resolved to a concrete URL
    PageResolved {
        /// Page index
        index: u32,
        /// Resolved URL
        url: String,
    },

    /// Discovery finished (threshold of consecutive misses reached or cancelled)
    DiscoveryComplete {
        /// Number of pages resolved
        pages: usize,
        /// Exclusive end of the scanned index range
        end_index: u32,
    },

    /// Parallel fetching started
    FetchStarted {
        /// Number of pages to fetch
        pages: usize,
        /// Concurrency degree for this run
        degree: usize,
    },

    /// A page was fetched successfully
    PageFetched {
        /// Page index
        index: u32,
        /// Payload size in bytes
        size: u64,
    },

    /// A page fetch failed (final for this run)
    PageFailed {
        /// Page index
        index: u32,
        /// Failure reason
        reason: String,
    },

    /// The artifact was written
    AssemblyComplete {
        /// Artifact path
        path: PathBuf,
        /// Number of pages in the artifact
        pages: usize,
        /// Sorted indices that are missing from the artifact
        missing: Vec<u32>,
    },

    /// The whole download finished
    DownloadComplete {
        /// Gallery identifier
        gallery_id: String,
        /// Artifact path, if anything was assembled
        path: Option<PathBuf>,
        /// Sorted indices that could not be fetched
        failed_pages: Vec<u32>,
    },

    /// The download was cancelled; partial results are preserved
    Cancelled {
        /// Gallery identifier
        gallery_id: String,
    },
}

/// Final report for one gallery download.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadReport {
    /// Gallery identifier extracted from the input URL
    pub gallery_id: String,
    /// Sanitized gallery title (may be empty if the page had none)
    pub title: String,
    /// Path of the written artifact; `None` when nothing could be assembled
    pub artifact_path: Option<PathBuf>,
    /// SHA-256 of the artifact file, hex-encoded
    pub artifact_sha256: Option<String>,
    /// Number of page indices resolved by discovery
    pub pages_resolved: usize,
    /// Number of pages fetched successfully
    pub pages_fetched: usize,
    /// Sorted page indices that failed to fetch
    pub failed_pages: Vec<u32>,
    /// True if the run was interrupted by cancellation
    pub cancelled: bool,
    /// When the run finished
    pub completed_at: DateTime<Utc>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_preference_order_is_i1_through_i6() {
        let numbers: Vec<u8> = Mirror::ALL.iter().map(|m| m.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn mirror_host_substitutes_number() {
        assert_eq!(Mirror::I3.host("i{n}.nhentaimg.com"), "i3.nhentaimg.com");
        assert_eq!(Mirror::I1.host("i{n}.nhentaimg.com"), "i1.nhentaimg.com");
    }

    #[test]
    fn mirror_host_without_placeholder_is_shared() {
        // Used by tests that point every mirror at one local server
        assert_eq!(Mirror::I5.host("127.0.0.1:8080"), "127.0.0.1:8080");
    }

    #[test]
    fn format_probe_order_is_jpg_png_webp() {
        let exts: Vec<&str> = ImageFormat::PROBE_ORDER
            .iter()
            .map(|f| f.extension())
            .collect();
        assert_eq!(exts, vec![".jpg", ".png", ".webp"]);
    }

    #[test]
    fn fetch_report_missing_indices_are_sorted_and_deduped() {
        let report = FetchReport {
            successes: BTreeMap::new(),
            failures: vec![
                PageFailure {
                    index: 7,
                    reason: "timeout".into(),
                },
                PageFailure {
                    index: 2,
                    reason: "500".into(),
                },
                PageFailure {
                    index: 7,
                    reason: "duplicate entry".into(),
                },
            ],
        };
        assert_eq!(report.missing_indices(), vec![2, 7]);
    }

    #[test]
    fn sequence_map_len_tracks_pages() {
        let mut map = SequenceMap::default();
        assert!(map.is_empty());
        map.pages.insert(
            1,
            ResolvedPage {
                index: 1,
                url: "http://i1.example/016/abc/1.jpg".into(),
                mirror: Mirror::I1,
                format: ImageFormat::Jpg,
            },
        );
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn event_serializes_with_snake_case_tag() {
        let event = Event::PageResolved {
            index: 4,
            url: "http://i1.example/016/abc/4.jpg".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "page_resolved");
        assert_eq!(json["index"], 4);
    }
}
