//! Scripted [`Transport`] implementation shared by unit tests.

use crate::client::Transport;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory transport with scripted probe/fetch behavior.
///
/// Tracks every probed URL and the peak number of concurrently running
/// fetches, so tests can assert enumeration order and admission-gate bounds.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    /// URLs whose existence probe answers true
    exists: HashSet<String>,
    /// URL → payload for successful fetches
    payloads: HashMap<String, Vec<u8>>,
    /// URLs whose fetch fails
    failing: HashSet<String>,
    /// Optional artificial latency per fetch, to widen concurrency windows
    fetch_delay: Option<Duration>,
    /// Every URL probed, in order
    probed: Mutex<Vec<String>>,
    /// Fetches currently in flight
    in_flight: AtomicUsize,
    /// Peak concurrent fetches observed
    max_in_flight: AtomicUsize,
    /// Markup returned by fetch_page, keyed by URL
    pages: HashMap<String, String>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_existing<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exists.extend(urls.into_iter().map(Into::into));
        self
    }

    pub(crate) fn with_payload(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        let url = url.into();
        self.exists.insert(url.clone());
        self.payloads.insert(url, bytes);
        self
    }

    pub(crate) fn with_failing_fetch(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.exists.insert(url.clone());
        self.failing.insert(url);
        self
    }

    pub(crate) fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub(crate) fn with_page(mut self, url: impl Into<String>, markup: impl Into<String>) -> Self {
        self.pages.insert(url.into(), markup.into());
        self
    }

    pub(crate) fn probe_count(&self) -> usize {
        self.probed.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub(crate) fn probed_urls(&self) -> Vec<String> {
        self.probed.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub(crate) fn max_concurrent_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn probe_exists(&self, url: &str) -> bool {
        if let Ok(mut probed) = self.probed.lock() {
            probed.push(url.to_string());
        }
        self.exists.contains(url)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing.contains(url) {
            Err(Error::Other(format!("scripted fetch failure for {url}")))
        } else if let Some(bytes) = self.payloads.get(url) {
            Ok(bytes.clone())
        } else {
            Err(Error::Other(format!("no scripted payload for {url}")))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Other(format!("no scripted page for {url}")))
    }
}
