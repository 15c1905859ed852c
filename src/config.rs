//! Configuration types for gallery-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Mirror host configuration
///
/// The mirror set itself is fixed (six hosts, tried in preference order);
/// only the host naming is configurable. Used as a nested sub-config within
/// [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Host pattern for image mirrors; `{n}` is replaced with the mirror
    /// number 1–6 (default: "i{n}.nhentaimg.com")
    #[serde(default = "default_image_host_pattern")]
    pub image_host_pattern: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            image_host_pattern: default_image_host_pattern(),
        }
    }
}

/// HTTP transport configuration (timeouts, identification)
///
/// All values are baked into the HTTP clients once at construction; nothing
/// is mutated per request. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// TCP connect timeout (default: 5 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Total timeout for page requests and existence probes (default: 10 seconds)
    #[serde(default = "default_probe_timeout", with = "duration_serde")]
    pub probe_timeout: Duration,

    /// Total timeout for full image transfers (default: 30 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub fetch_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            probe_timeout: default_probe_timeout(),
            fetch_timeout: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Sequence discovery configuration
///
/// The defaults are behavioral policy constants; changing them changes which
/// sequences are considered complete. Used as a nested sub-config within
/// [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Number of consecutive unresolved indices that ends the scan (default: 5)
    ///
    /// This is a deliberate heuristic: a sequence with a real gap of this
    /// many pages will be cut short. It guarantees termination, not
    /// completeness.
    #[serde(default = "default_miss_threshold")]
    pub miss_threshold: u32,

    /// Probe a window of low indices across all mirrors first and pin the
    /// scan to the first mirror that answers (default: true)
    ///
    /// Pure performance refinement; discovery behaves identically with it
    /// disabled, just wider per-index enumeration.
    #[serde(default = "default_true")]
    pub pin_mirror: bool,

    /// Number of low indices probed by the mirror-pinning pass (default: 5)
    #[serde(default = "default_pin_window")]
    pub pin_window: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            miss_threshold: default_miss_threshold(),
            pin_mirror: true,
            pin_window: default_pin_window(),
        }
    }
}

/// Gallery site configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Base URL of the gallery site (default: "https://nhentai.xxx")
    #[serde(default = "default_page_base_url")]
    pub page_base_url: String,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            page_base_url: default_page_base_url(),
        }
    }
}

/// Output artifact configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory artifacts are written into (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// Retry behavior for the gallery page fetch
///
/// Retries apply ONLY to fetching the gallery page markup. Existence probes
/// and page-image fetches are never retried: for a probe the next candidate
/// URL substitutes for a retry, and a failed image fetch is final for the run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Main configuration for [`GalleryDownloader`](crate::GalleryDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`mirrors`](MirrorConfig) — mirror host naming
/// - [`http`](HttpConfig) — timeouts and request identity
/// - [`discovery`](DiscoveryConfig) — scan termination and mirror pinning
/// - [`gallery`](GalleryConfig) — gallery site location
/// - [`output`](OutputConfig) — artifact directory
/// - [`retry`](RetryConfig) — gallery-page fetch retries
///
/// All sub-config fields are flattened for serialization, so the JSON/TOML
/// format stays flat (no nesting).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Mirror host naming
    #[serde(flatten)]
    pub mirrors: MirrorConfig,

    /// HTTP transport settings
    #[serde(flatten)]
    pub http: HttpConfig,

    /// Sequence discovery settings
    #[serde(flatten)]
    pub discovery: DiscoveryConfig,

    /// Gallery site settings
    #[serde(flatten)]
    pub gallery: GalleryConfig,

    /// Output artifact settings
    #[serde(flatten)]
    pub output: OutputConfig,

    /// Gallery-page retry settings
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.discovery.miss_threshold == 0 {
            return Err(Error::Config {
                message: "miss_threshold must be at least 1".to_string(),
                key: Some("miss_threshold".to_string()),
            });
        }
        if self.mirrors.image_host_pattern.trim().is_empty() {
            return Err(Error::Config {
                message: "image_host_pattern must not be empty".to_string(),
                key: Some("image_host_pattern".to_string()),
            });
        }
        if let Err(e) = url::Url::parse(&self.gallery.page_base_url) {
            return Err(Error::Config {
                message: format!("page_base_url is not a valid URL: {e}"),
                key: Some("page_base_url".to_string()),
            });
        }
        Ok(())
    }
}

fn default_image_host_pattern() -> String {
    "i{n}.nhentaimg.com".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133".to_string()
}

fn default_miss_threshold() -> u32 {
    5
}

fn default_pin_window() -> u32 {
    5
}

fn default_page_base_url() -> String {
    "https://nhentai.xxx".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
