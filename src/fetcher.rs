//! Bounded-concurrency page fetching
//!
//! One fetch job per resolved index, admitted through a counting semaphore
//! sized by the concurrency policy — any job starts the moment a permit
//! frees, there is no fixed worker pool. Job failures are recorded per index
//! and never abort sibling jobs; there are no retries, a failed fetch is
//! final for the run. The run joins every job before returning, so the
//! report always partitions the resolved-index set exactly.

use crate::client::Transport;
use crate::concurrency::{ConcurrencyMode, degree_for};
use crate::types::{Event, FetchReport, PageFailure, PageSuccess, SequenceMap};
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;

/// Runs bounded-parallel fetch jobs over a resolved sequence.
pub struct FetchScheduler {
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<Event>,
}

impl FetchScheduler {
    /// Build a scheduler.
    pub fn new(
        transport: Arc<dyn Transport>,
        cancel: CancellationToken,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            transport,
            cancel,
            event_tx,
        }
    }

    /// Fetch every resolved page, at most `degree` in flight at once.
    ///
    /// Cancellation stops admitting queued jobs; jobs already past the gate
    /// finish and their outcomes are kept. Never-admitted indices are
    /// reported as failures so the outcome set still covers every resolved
    /// index.
    pub async fn fetch_all(&self, sequence: &SequenceMap) -> FetchReport {
        let mut report = FetchReport::default();
        if sequence.is_empty() {
            return report;
        }

        let degree = degree_for(sequence.len(), ConcurrencyMode::Fetch);
        tracing::info!(pages = sequence.len(), degree, "starting parallel fetch");
        let _ = self.event_tx.send(Event::FetchStarted {
            pages: sequence.len(),
            degree,
        });

        let gate = Arc::new(Semaphore::new(degree));
        let mut jobs = Vec::with_capacity(sequence.len());

        for page in sequence.pages.values() {
            let transport = Arc::clone(&self.transport);
            let gate = Arc::clone(&gate);
            let cancel = self.cancel.clone();
            let event_tx = self.event_tx.clone();
            let index = page.index;
            let url = page.url.clone();
            let format = page.format;

            jobs.push(tokio::spawn(async move {
                let Ok(_permit) = gate.acquire_owned().await else {
                    return Err(PageFailure {
                        index,
                        reason: "admission gate closed".to_string(),
                    });
                };
                if cancel.is_cancelled() {
                    return Err(PageFailure {
                        index,
                        reason: "cancelled".to_string(),
                    });
                }

                match transport.fetch_bytes(&url).await {
                    Ok(bytes) => {
                        tracing::debug!(index, size = bytes.len(), "fetched page");
                        let _ = event_tx.send(Event::PageFetched {
                            index,
                            size: bytes.len() as u64,
                        });
                        Ok(PageSuccess {
                            index,
                            bytes,
                            format,
                        })
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        tracing::warn!(index, url = %url, %reason, "page fetch failed");
                        let _ = event_tx.send(Event::PageFailed {
                            index,
                            reason: reason.clone(),
                        });
                        Err(PageFailure { index, reason })
                    }
                }
            }));
        }

        // Join barrier: the run is not finished until every job has an outcome.
        let outcomes = futures::future::join_all(jobs).await;
        for (outcome, &index) in outcomes.into_iter().zip(sequence.pages.keys()) {
            match outcome {
                Ok(Ok(success)) => {
                    report.successes.insert(success.index, success);
                }
                Ok(Err(failure)) => report.failures.push(failure),
                Err(e) => report.failures.push(PageFailure {
                    index,
                    reason: format!("fetch task aborted: {e}"),
                }),
            }
        }

        tracing::info!(
            fetched = report.successes.len(),
            failed = report.failures.len(),
            "fetch run complete"
        );
        report
    }
}
