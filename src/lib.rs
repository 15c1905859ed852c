//! # gallery-dl
//!
//! Adaptive concurrent download library for numbered image galleries.
//!
//! Gallery pages advertise only thumbnails; the full-size page URLs have to
//! be guessed. This crate infers a URL template from the thumbnails, probes
//! a candidate space of {mirror × format × shape × scheme} to resolve each
//! page index, stops after a run of consecutive misses, fetches the resolved
//! pages under an adaptive concurrency cap, and assembles the results into a
//! single CBZ artifact — tolerating (and reporting) individual page failures
//! along the way.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Partial results over rollback** - Failures and cancellation keep
//!   everything already downloaded
//!
//! ## Quick Start
//!
//! ```no_run
//! use gallery_dl::{Config, GalleryDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = GalleryDownloader::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = downloader
//!         .download("https://nhentai.xxx/g/123456/")
//!         .await?;
//!     println!(
//!         "fetched {} pages, missing {:?}",
//!         report.pages_fetched, report.failed_pages
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// CBZ artifact assembly
pub mod assembler;
/// HTTP transport seam
pub mod client;
/// Workload-adaptive concurrency sizing
pub mod concurrency;
/// Configuration types
pub mod config;
/// Sequence discovery state machine
pub mod discovery;
/// High-level download orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Bounded-concurrency page fetching
pub mod fetcher;
/// Gallery page glue (ids, seeds, titles)
pub mod gallery;
/// URL template inference
pub mod pattern;
/// Candidate enumeration and per-index resolution
pub mod resolver;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use concurrency::{ConcurrencyMode, degree_for};
pub use config::{
    Config, DiscoveryConfig, GalleryConfig, HttpConfig, MirrorConfig, OutputConfig, RetryConfig,
};
pub use downloader::GalleryDownloader;
pub use error::{Error, Result};
pub use pattern::UrlTemplate;
pub use types::{
    DownloadReport, Event, FetchReport, ImageFormat, Mirror, PageFailure, PageSuccess,
    ResolvedPage, SequenceMap,
};

/// Run one download with graceful signal handling.
///
/// A termination signal cancels the downloader instead of aborting the
/// process, so the download returns whatever it had already resolved,
/// fetched, and assembled.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with a `ctrl_c` fallback if
///   signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use gallery_dl::{Config, GalleryDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = GalleryDownloader::new(Config::default())?;
///     let report = run_with_shutdown(downloader, "https://nhentai.xxx/g/123456/").await?;
///     println!("done: {:?}", report.artifact_path);
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(
    downloader: GalleryDownloader,
    url: &str,
) -> Result<DownloadReport> {
    let watcher = tokio::spawn({
        let downloader = downloader.clone();
        async move {
            wait_for_signal().await;
            downloader.cancel();
        }
    });

    let result = downloader.download(url).await;
    watcher.abort();
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        _ => {
            tracing::warn!("Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
    }
}
