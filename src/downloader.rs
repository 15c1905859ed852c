//! Gallery download orchestration
//!
//! [`GalleryDownloader`] wires the pipeline together: gallery page → seeds →
//! template → sequence discovery → bounded-parallel fetch → CBZ assembly.
//! It owns the HTTP transport, the event channel, and the cancellation
//! token; the stage components stay independently testable behind it.

use crate::assembler;
use crate::client::{HttpTransport, Transport};
use crate::config::Config;
use crate::discovery::SequenceDiscoverer;
use crate::error::{Error, Result};
use crate::fetcher::FetchScheduler;
use crate::gallery;
use crate::pattern::UrlTemplate;
use crate::resolver::UrlResolver;
use crate::retry::fetch_with_retry;
use crate::types::{DownloadReport, Event};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// High-level gallery downloader.
///
/// Cheap to clone; clones share the transport, event channel, and
/// cancellation token.
#[derive(Clone)]
pub struct GalleryDownloader {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    event_tx: broadcast::Sender<Event>,
    cancel: CancellationToken,
}

impl GalleryDownloader {
    /// Create a downloader from configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config.http)?);
        Ok(Self::assemble_parts(config, transport))
    }

    /// Create a downloader over an arbitrary transport (used by tests).
    #[cfg(test)]
    pub(crate) fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble_parts(config, transport))
    }

    fn assemble_parts(config: Config, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(config),
            transport,
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Stop issuing new probes and fetches as soon as possible.
    ///
    /// Work already resolved, fetched, or assembled is preserved; an
    /// in-flight [`download`](Self::download) call returns its partial
    /// report instead of rolling anything back.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Download one gallery and assemble it into a CBZ artifact.
    ///
    /// Fatal errors are limited to the stages nothing can proceed without:
    /// an unusable URL, an unreachable gallery page (after retries), or a
    /// page with no recognizable pattern seed. Per-page resolution and fetch
    /// failures are collected into the report instead.
    pub async fn download(&self, url: &str) -> Result<DownloadReport> {
        if self.cancel.is_cancelled() {
            return Err(Error::ShuttingDown);
        }

        let gallery_id = gallery::extract_gallery_id(url)?;
        let page_url =
            gallery::gallery_page_url(&self.config.gallery.page_base_url, &gallery_id);
        tracing::info!(%gallery_id, %page_url, "fetching gallery page");

        let markup = fetch_with_retry(&self.config.retry, || {
            let transport = Arc::clone(&self.transport);
            let page_url = page_url.clone();
            async move { transport.fetch_page(&page_url).await }
        })
        .await?;

        let title = gallery::extract_title(&markup)
            .map(|t| gallery::sanitize_title(&t))
            .unwrap_or_default();
        let seeds = gallery::extract_seeds(&markup, &self.config.mirrors.image_host_pattern);
        let template = UrlTemplate::from_seeds(&seeds)?;

        let _ = self.event_tx.send(Event::DiscoveryStarted {
            gallery_id: gallery_id.clone(),
        });

        let resolver = Arc::new(UrlResolver::new(
            Arc::clone(&self.transport),
            template,
            self.config.mirrors.image_host_pattern.clone(),
        ));
        let discoverer = SequenceDiscoverer::new(
            resolver,
            self.config.discovery.clone(),
            self.cancel.clone(),
            self.event_tx.clone(),
        );
        let sequence = discoverer.discover().await;

        let scheduler = FetchScheduler::new(
            Arc::clone(&self.transport),
            self.cancel.clone(),
            self.event_tx.clone(),
        );
        let fetch_report = scheduler.fetch_all(&sequence).await;

        let file_name = if title.is_empty() {
            format!("{gallery_id}.cbz")
        } else {
            format!("{gallery_id}_{title}.cbz")
        };
        let artifact = self.config.output.output_dir.join(file_name);

        let (artifact_path, artifact_sha256, failed_pages) =
            match assembler::assemble_to_path(&fetch_report, &artifact) {
                Ok(missing) => {
                    let digest = sha256_of_file(&artifact)?;
                    let _ = self.event_tx.send(Event::AssemblyComplete {
                        path: artifact.clone(),
                        pages: fetch_report.successes.len(),
                        missing: missing.clone(),
                    });
                    (Some(artifact), Some(digest), missing)
                }
                Err(Error::NothingToAssemble) => {
                    tracing::warn!(%gallery_id, "no pages fetched, skipping artifact");
                    (None, None, fetch_report.missing_indices())
                }
                Err(e) => return Err(e),
            };

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            let _ = self.event_tx.send(Event::Cancelled {
                gallery_id: gallery_id.clone(),
            });
        } else {
            let _ = self.event_tx.send(Event::DownloadComplete {
                gallery_id: gallery_id.clone(),
                path: artifact_path.clone(),
                failed_pages: failed_pages.clone(),
            });
        }

        Ok(DownloadReport {
            gallery_id,
            title,
            artifact_path,
            artifact_sha256,
            pages_resolved: sequence.len(),
            pages_fetched: fetch_report.successes.len(),
            failed_pages,
            cancelled,
            completed_at: chrono::Utc::now(),
        })
    }
}

/// Hex-encoded SHA-256 of a file's contents.
fn sha256_of_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;
    use tempfile::TempDir;

    const HOSTS: &str = "i{n}.example.net";
    const PAGE_BASE: &str = "https://gallery.example";

    fn markup_with_seed() -> &'static str {
        r#"<div id="info"><h1>Test Gallery</h1></div>
           <img class="lazyload" data-src="http://i1.example.net/016/y3v5c6xhgf/cover.jpg">"#
    }

    fn page_url(index: u32) -> String {
        format!("http://i1.example.net/016/y3v5c6xhgf/{index}.jpg")
    }

    fn test_config(output_dir: &Path) -> Config {
        let mut config = Config::default();
        config.mirrors.image_host_pattern = HOSTS.to_string();
        config.gallery.page_base_url = PAGE_BASE.to_string();
        config.output.output_dir = output_dir.to_path_buf();
        config.discovery.pin_mirror = false;
        config
    }

    fn downloader_with(transport: ScriptedTransport, output_dir: &Path) -> GalleryDownloader {
        GalleryDownloader::with_transport(test_config(output_dir), Arc::new(transport)).unwrap()
    }

    #[tokio::test]
    async fn downloads_and_assembles_a_gallery() {
        let temp = TempDir::new().unwrap();
        let mut transport = ScriptedTransport::new()
            .with_page("https://gallery.example/g/777/", markup_with_seed());
        for index in 1..=3 {
            transport = transport.with_payload(page_url(index), vec![index as u8; 32]);
        }

        let downloader = downloader_with(transport, temp.path());
        let report = downloader
            .download("https://gallery.example/g/777/")
            .await
            .unwrap();

        assert_eq!(report.gallery_id, "777");
        assert_eq!(report.title, "Test Gallery");
        assert_eq!(report.pages_resolved, 3);
        assert_eq!(report.pages_fetched, 3);
        assert!(report.failed_pages.is_empty());
        assert!(!report.cancelled);

        let artifact = report.artifact_path.unwrap();
        assert_eq!(
            artifact.file_name().unwrap().to_str().unwrap(),
            "777_Test Gallery.cbz"
        );
        assert!(artifact.exists());
        assert_eq!(report.artifact_sha256.unwrap().len(), 64);
    }

    #[tokio::test]
    async fn partial_failure_still_produces_artifact() {
        let temp = TempDir::new().unwrap();
        let transport = ScriptedTransport::new()
            .with_page("https://gallery.example/g/777/", markup_with_seed())
            .with_payload(page_url(1), b"one".to_vec())
            .with_failing_fetch(page_url(2))
            .with_payload(page_url(3), b"three".to_vec());

        let downloader = downloader_with(transport, temp.path());
        let report = downloader
            .download("https://gallery.example/g/777/")
            .await
            .unwrap();

        assert_eq!(report.pages_resolved, 3);
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.failed_pages, vec![2]);
        assert!(report.artifact_path.is_some());
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_any_network_access() {
        let temp = TempDir::new().unwrap();
        let downloader = downloader_with(ScriptedTransport::new(), temp.path());

        let err = downloader
            .download("https://gallery.example/about")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGalleryUrl(_)));
    }

    #[tokio::test]
    async fn page_without_seeds_is_pattern_not_found() {
        let temp = TempDir::new().unwrap();
        let transport = ScriptedTransport::new()
            .with_page("https://gallery.example/g/777/", "<html>no thumbnails</html>");

        let downloader = downloader_with(transport, temp.path());
        let err = downloader
            .download("https://gallery.example/g/777/")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PatternNotFound { .. }));
    }

    #[tokio::test]
    async fn nothing_fetched_returns_report_without_artifact() {
        let temp = TempDir::new().unwrap();
        // Pages resolve but every fetch fails
        let transport = ScriptedTransport::new()
            .with_page("https://gallery.example/g/777/", markup_with_seed())
            .with_failing_fetch(page_url(1))
            .with_failing_fetch(page_url(2));

        let downloader = downloader_with(transport, temp.path());
        let report = downloader
            .download("https://gallery.example/g/777/")
            .await
            .unwrap();

        assert_eq!(report.pages_resolved, 2);
        assert_eq!(report.pages_fetched, 0);
        assert_eq!(report.failed_pages, vec![1, 2]);
        assert!(report.artifact_path.is_none());
        assert!(report.artifact_sha256.is_none());
        assert_eq!(
            std::fs::read_dir(temp.path()).unwrap().count(),
            0,
            "no artifact file may be written"
        );
    }

    #[tokio::test]
    async fn untitled_gallery_uses_bare_id_filename() {
        let temp = TempDir::new().unwrap();
        let markup = r#"<img class="lazyload" data-src="http://i1.example.net/016/y3v5c6xhgf/cover.jpg">"#;
        let transport = ScriptedTransport::new()
            .with_page("https://gallery.example/g/9/", markup)
            .with_payload(page_url(1), b"one".to_vec());

        let downloader = downloader_with(transport, temp.path());
        let report = downloader
            .download("https://gallery.example/g/9/")
            .await
            .unwrap();

        assert_eq!(
            report
                .artifact_path
                .unwrap()
                .file_name()
                .unwrap()
                .to_str()
                .unwrap(),
            "9.cbz"
        );
    }

    #[tokio::test]
    async fn download_after_cancel_is_refused() {
        let temp = TempDir::new().unwrap();
        let downloader = downloader_with(ScriptedTransport::new(), temp.path());
        downloader.cancel();

        let err = downloader
            .download("https://gallery.example/g/777/")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ShuttingDown));
    }

    #[tokio::test]
    async fn emits_lifecycle_events_in_order() {
        let temp = TempDir::new().unwrap();
        let transport = ScriptedTransport::new()
            .with_page("https://gallery.example/g/777/", markup_with_seed())
            .with_payload(page_url(1), b"one".to_vec());

        let downloader = downloader_with(transport, temp.path());
        let mut events = downloader.subscribe();
        downloader
            .download("https://gallery.example/g/777/")
            .await
            .unwrap();

        let collected: Vec<Event> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        let kinds: Vec<&str> = collected
            .iter()
            .map(|e| match e {
                Event::DiscoveryStarted { .. } => "discovery_started",
                Event::PageResolved { .. } => "page_resolved",
                Event::DiscoveryComplete { .. } => "discovery_complete",
                Event::FetchStarted { .. } => "fetch_started",
                Event::PageFetched { .. } => "page_fetched",
                Event::PageFailed { .. } => "page_failed",
                Event::AssemblyComplete { .. } => "assembly_complete",
                Event::DownloadComplete { .. } => "download_complete",
                Event::Cancelled { .. } => "cancelled",
            })
            .collect();

        assert_eq!(kinds.first(), Some(&"discovery_started"));
        assert_eq!(kinds.last(), Some(&"download_complete"));
        let discovery_pos = kinds.iter().position(|k| *k == "discovery_complete").unwrap();
        let fetch_pos = kinds.iter().position(|k| *k == "fetch_started").unwrap();
        assert!(discovery_pos < fetch_pos);
    }
}
