//! Sequence discovery — walks page indices until the sequence ends
//!
//! Discovery is a sequential scan: starting at index 1, each index either
//! resolves (recorded, miss counter reset) or misses (counter incremented).
//! A run of `miss_threshold` consecutive misses ends the scan. The rule
//! guarantees termination but not completeness — a real gap of that many
//! pages cuts the sequence short, which is the documented trade-off.
//!
//! An optional pinning pass narrows the scan first: a small window of low
//! indices is probed across every mirror concurrently, and the first mirror
//! that answers becomes the only mirror for the rest of the scan. This
//! shrinks per-index enumeration width but never changes which indices
//! resolve; discovery works identically (only slower) with pinning disabled
//! or with a window that confirms no mirror.

use crate::concurrency::{ConcurrencyMode, degree_for};
use crate::config::DiscoveryConfig;
use crate::resolver::UrlResolver;
use crate::types::{Event, Mirror, SequenceMap};
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;

/// Drives per-index URL resolution across increasing indices.
pub struct SequenceDiscoverer {
    resolver: Arc<UrlResolver>,
    config: DiscoveryConfig,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<Event>,
}

impl SequenceDiscoverer {
    /// Build a discoverer for one sequence.
    pub fn new(
        resolver: Arc<UrlResolver>,
        config: DiscoveryConfig,
        cancel: CancellationToken,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            resolver,
            config,
            cancel,
            event_tx,
        }
    }

    /// Scan indices from 1 upward until `miss_threshold` consecutive misses.
    ///
    /// Cancellation between indices stops the scan promptly; everything
    /// already resolved is preserved in the returned map. Given identical
    /// remote state the result is identical across runs.
    pub async fn discover(&self) -> SequenceMap {
        let pinned = if self.config.pin_mirror {
            self.pin_working_mirror().await
        } else {
            None
        };

        let mirrors: &[Mirror] = match &pinned {
            Some(mirror) => {
                tracing::info!(mirror = %mirror, "pinned scan to confirmed mirror");
                std::slice::from_ref(mirror)
            }
            None => &Mirror::ALL,
        };

        let mut sequence = SequenceMap::default();
        let mut index: u32 = 1;
        let mut consecutive_misses: u32 = 0;

        while consecutive_misses < self.config.miss_threshold {
            if self.cancel.is_cancelled() {
                tracing::info!(index, "discovery cancelled, keeping partial results");
                break;
            }

            match self.resolver.resolve(index, mirrors).await {
                Some(page) => {
                    let _ = self.event_tx.send(Event::PageResolved {
                        index,
                        url: page.url.clone(),
                    });
                    sequence.pages.insert(index, page);
                    consecutive_misses = 0;
                }
                None => {
                    consecutive_misses += 1;
                    tracing::debug!(index, consecutive_misses, "index unresolved");
                }
            }
            index += 1;
        }

        sequence.end_index = index;
        tracing::info!(
            pages = sequence.len(),
            end_index = sequence.end_index,
            "discovery complete"
        );
        let _ = self.event_tx.send(Event::DiscoveryComplete {
            pages: sequence.len(),
            end_index: sequence.end_index,
        });
        sequence
    }

    /// Probe a window of low indices across all mirrors and return the first
    /// mirror that answered, in (index, mirror-preference) order.
    async fn pin_working_mirror(&self) -> Option<Mirror> {
        let window = self.config.pin_window;
        if window == 0 {
            return None;
        }

        let probes = window as usize * Mirror::ALL.len();
        let degree = degree_for(probes, ConcurrencyMode::Probe);
        tracing::debug!(window, degree, "probing mirror window");
        let gate = Arc::new(Semaphore::new(degree));

        let mut tasks = Vec::with_capacity(probes);
        for index in 1..=window {
            for mirror in Mirror::ALL {
                let resolver = Arc::clone(&self.resolver);
                let gate = Arc::clone(&gate);
                let cancel = self.cancel.clone();
                tasks.push(tokio::spawn(async move {
                    let Ok(_permit) = gate.acquire_owned().await else {
                        return None;
                    };
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let mirrors = [mirror];
                    resolver.resolve(index, &mirrors).await.map(|_| mirror)
                }));
            }
        }

        // (index, mirror-preference) order is preserved by join_all, so the
        // first confirmed entry is the preferred mirror
        futures::future::join_all(tasks)
            .await
            .into_iter()
            .flatten()
            .flatten()
            .next()
    }
}
