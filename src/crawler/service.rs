//! Crawler service - scheduler and worker pool orchestration
//!
//! This module contains the long-running service that drives queued items
//! through the pipeline, including:
//! - An explicit start/stop lifecycle with idempotent transitions
//! - A scheduler task that polls storage for queued items
//! - A bounded work queue with drop-on-full backpressure
//! - A fixed pool of workers running fetch -> analyze -> persist
//!
//! Storage remains the source of truth throughout: an item the queue
//! drops, or one abandoned by a shutdown, is still `queued` in storage
//! and is simply offered again on a later polling cycle.

use crate::config::CrawlerConfig;
use crate::crawler::analyzer::analyze_page;
use crate::crawler::fetcher::{build_http_client, fetch_page, HttpProbe, LivenessProbe};
use crate::state::{CrawlStatus, Lifecycle, ServicePhase};
use crate::storage::{AnalysisRecord, BrokenLinkRecord, CrawlItem, Storage};
use crate::url::normalize_url;
use crate::PagelensError;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

/// Long-running crawl service owning the scheduler and worker pool
pub struct CrawlerService<S: Storage + Send + 'static> {
    config: CrawlerConfig,
    storage: Arc<Mutex<S>>,
    client: Client,
    probe: Arc<dyn LivenessProbe>,
    lifecycle: Lifecycle,
    shutdown_tx: Option<watch::Sender<bool>>,
    handles: Vec<JoinHandle<()>>,
}

impl<S: Storage + Send + 'static> CrawlerService<S> {
    /// Creates a new service over the given storage
    ///
    /// Builds the shared HTTP client and a HEAD-request liveness probe
    /// from the configuration. The service starts in the stopped phase;
    /// nothing runs until `start` is called.
    pub fn new(config: CrawlerConfig, storage: Arc<Mutex<S>>) -> Result<Self, PagelensError> {
        let client = build_http_client(&config)?;
        let probe = Arc::new(HttpProbe::new(client.clone(), config.probe_timeout()));

        Ok(Self {
            config,
            storage,
            client,
            probe,
            lifecycle: Lifecycle::new(),
            shutdown_tx: None,
            handles: Vec::new(),
        })
    }

    /// Replaces the liveness probe, used by tests to stub probe results
    pub fn with_probe(mut self, probe: Arc<dyn LivenessProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ServicePhase {
        self.lifecycle.phase()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Starts the scheduler and worker pool
    ///
    /// Idempotent: a second call while the service is starting or running
    /// is a no-op.
    pub fn start(&mut self) {
        if !self.lifecycle.begin_start() {
            tracing::debug!("Crawler service already started");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (queue_tx, queue_rx) = mpsc::channel::<CrawlItem>(self.config.queue_capacity);
        let queue_rx = Arc::new(AsyncMutex::new(queue_rx));
        let in_flight: Arc<Mutex<HashSet<i64>>> = Arc::new(Mutex::new(HashSet::new()));

        let mut handles = Vec::with_capacity(self.config.worker_count + 1);
        handles.push(tokio::spawn(run_scheduler(
            self.storage.clone(),
            queue_tx,
            shutdown_rx.clone(),
            in_flight.clone(),
            self.config.poll_interval(),
        )));

        for worker_id in 0..self.config.worker_count {
            handles.push(tokio::spawn(run_worker(
                worker_id,
                self.storage.clone(),
                queue_rx.clone(),
                shutdown_rx.clone(),
                in_flight.clone(),
                self.client.clone(),
                self.probe.clone(),
                self.config.probe_concurrency,
            )));
        }

        self.shutdown_tx = Some(shutdown_tx);
        self.handles = handles;
        self.lifecycle.mark_running();
        tracing::info!(
            "Crawler service started with {} workers",
            self.config.worker_count
        );
    }

    /// Signals shutdown and waits for the scheduler and workers to exit
    ///
    /// Workers finish the item they are processing; items still in the
    /// queue or in storage stay `queued` and survive a restart. Idempotent
    /// like `start`.
    pub async fn stop(&mut self) {
        if !self.lifecycle.begin_stop() {
            tracing::debug!("Crawler service is not running");
            return;
        }

        tracing::info!("Stopping crawler service");
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!("Crawler task panicked: {}", e);
            }
        }

        self.lifecycle.mark_stopped();
        tracing::info!("Crawler service stopped");
    }
}

/// Polls storage for queued items and offers them to the work queue
///
/// Items are offered oldest first. When the queue is full the remaining
/// items are left in storage for a later cycle rather than blocking the
/// scheduler.
async fn run_scheduler<S: Storage + Send + 'static>(
    storage: Arc<Mutex<S>>,
    queue_tx: mpsc::Sender<CrawlItem>,
    mut shutdown_rx: watch::Receiver<bool>,
    in_flight: Arc<Mutex<HashSet<i64>>>,
    poll_interval: Duration,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                tracing::debug!("Scheduler shutting down");
                return;
            }
            _ = ticker.tick() => {}
        }

        let queued = {
            let storage = storage.lock().unwrap();
            storage.list_queued()
        };
        let queued = match queued {
            Ok(items) => items,
            Err(e) => {
                tracing::error!("Error listing queued items: {}", e);
                continue;
            }
        };

        for item in queued {
            let id = item.id;

            // An item already handed to a worker still reads as queued in
            // storage until the worker transitions it; skip those.
            if !in_flight.lock().unwrap().insert(id) {
                continue;
            }

            match queue_tx.try_send(item) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    in_flight.lock().unwrap().remove(&id);
                    tracing::debug!("Work queue full, deferring item {}", id);
                }
                Err(TrySendError::Closed(_)) => {
                    in_flight.lock().unwrap().remove(&id);
                    return;
                }
            }
        }
    }
}

/// Drains the work queue, processing one item at a time
#[allow(clippy::too_many_arguments)]
async fn run_worker<S: Storage + Send + 'static>(
    worker_id: usize,
    storage: Arc<Mutex<S>>,
    queue_rx: Arc<AsyncMutex<mpsc::Receiver<CrawlItem>>>,
    mut shutdown_rx: watch::Receiver<bool>,
    in_flight: Arc<Mutex<HashSet<i64>>>,
    client: Client,
    probe: Arc<dyn LivenessProbe>,
    probe_concurrency: usize,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // Receivers are single-consumer; workers take turns holding the
        // lock while waiting, then release it to process.
        let item = {
            let mut queue = queue_rx.lock().await;
            tokio::select! {
                _ = shutdown_rx.changed() => None,
                item = queue.recv() => item,
            }
        };

        let Some(item) = item else {
            break;
        };

        let id = item.id;
        process_item(&storage, &client, probe.as_ref(), probe_concurrency, item).await;
        in_flight.lock().unwrap().remove(&id);
    }

    tracing::debug!("Worker {} stopped", worker_id);
}

/// Drives one item through fetch -> analyze -> persist -> transition
async fn process_item<S: Storage>(
    storage: &Arc<Mutex<S>>,
    client: &Client,
    probe: &dyn LivenessProbe,
    probe_concurrency: usize,
    item: CrawlItem,
) {
    tracing::debug!("Processing item {}: {}", item.id, item.url);

    let claimed = {
        let mut storage = storage.lock().unwrap();
        storage.set_status(item.id, CrawlStatus::Running, None)
    };
    if let Err(e) = claimed {
        // Deleted or already transitioned between poll and pickup
        tracing::warn!("Could not claim item {}: {}", item.id, e);
        return;
    }

    match crawl_url(client, probe, probe_concurrency, &item.url).await {
        Ok((analysis, broken_links)) => {
            let saved = {
                let mut storage = storage.lock().unwrap();
                storage.save_analysis(item.id, &analysis, &broken_links)
            };
            match saved {
                Ok(()) => {
                    let completed = {
                        let mut storage = storage.lock().unwrap();
                        storage.set_status(item.id, CrawlStatus::Completed, None)
                    };
                    match completed {
                        Ok(()) => tracing::info!("Completed analysis of {}", item.url),
                        Err(e) => {
                            tracing::error!("Error marking item {} completed: {}", item.id, e)
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Error saving analysis for {}: {}", item.url, e);
                    mark_failed(storage, item.id, &format!("failed to save analysis: {}", e));
                }
            }
        }
        Err(message) => {
            tracing::warn!("Analysis of {} failed: {}", item.url, message);
            mark_failed(storage, item.id, &message);
        }
    }
}

/// Best-effort transition to `failed`; a storage error here only logs
fn mark_failed<S: Storage>(storage: &Arc<Mutex<S>>, id: i64, message: &str) {
    let result = {
        let mut storage = storage.lock().unwrap();
        storage.set_status(id, CrawlStatus::Failed, Some(message))
    };
    if let Err(e) = result {
        tracing::error!("Error marking item {} failed: {}", id, e);
    }
}

/// Normalizes, fetches, and analyzes one URL
///
/// Errors collapse to their display text, which becomes the item's
/// recorded error message.
async fn crawl_url(
    client: &Client,
    probe: &dyn LivenessProbe,
    probe_concurrency: usize,
    raw_url: &str,
) -> Result<(AnalysisRecord, Vec<BrokenLinkRecord>), String> {
    let url = normalize_url(raw_url).map_err(|e| e.to_string())?;
    let page = fetch_page(client, url.as_str())
        .await
        .map_err(|e| e.to_string())?;
    Ok(analyze_page(&page.body, &url, probe, probe_concurrency).await)
}
