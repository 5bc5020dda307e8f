//! # Fetch Worker Pool
//!
//! Bounded-concurrency fetch, validate and store stage.
//!
//! ## Overview
//!
//! `concurrency` workers share one work queue (the range iterator behind an
//! async mutex) and one results channel. Each worker pulls the next code,
//! handles it to completion and pulls again until the queue runs dry, so at
//! most `concurrency` requests are ever in flight and every code is attempted
//! exactly once.
//!
//! Per code:
//!
//! ```text
//! GET endpoint(code) ──> transport error / non-2xx ──> NetworkFailure
//!         │
//!         └──> ContentValidator ──> Invalid ──> RejectedContent
//!                    │
//!                    └──> write <output>/<code>.jpg ──> Success | StorageFailure
//! ```
//!
//! A failing code never stops the others, and a panic while handling one code
//! is recorded as a failure for that code. Nothing is retried.

use crate::error::Result;
use crate::outcome::{CrawlReport, FetchOutcome};
use crate::range::{CodeRange, Codes};
use crate::validator::{ContentValidator, Validation};
use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::storage::FileSystemAccess;
use core_library::ImageCode;
use core_runtime::config::CrawlSettings;
use core_runtime::logging::strip_path;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, instrument, warn};

type WorkQueue = Arc<Mutex<Codes>>;

/// Runs crawl jobs over a code range.
pub struct FetchWorkerPool {
    settings: Arc<CrawlSettings>,
    http_client: Arc<dyn HttpClient>,
    file_system: Arc<dyn FileSystemAccess>,
    validator: Arc<ContentValidator>,
}

impl FetchWorkerPool {
    /// # Errors
    ///
    /// Returns [`CrawlError::Config`](crate::CrawlError::Config) if the
    /// settings do not validate, e.g. a concurrency of zero.
    pub fn new(
        settings: CrawlSettings,
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<dyn FileSystemAccess>,
    ) -> Result<Self> {
        settings.validate()?;
        let validator = Arc::new(ContentValidator::new(settings.sentinel_text.clone()));

        Ok(Self {
            settings: Arc::new(settings),
            http_client,
            file_system,
            validator,
        })
    }

    /// Crawl every code in `range` into `output_dir`.
    ///
    /// The folder is created before any worker starts. Outcomes are collected
    /// in completion order.
    ///
    /// # Errors
    ///
    /// Only fails if the output folder cannot be created. Per-code problems
    /// are reported as [`FetchOutcome`]s.
    #[instrument(
        skip(self, range, output_dir),
        fields(start = range.start(), end = range.end(), workers = self.settings.concurrency)
    )]
    pub async fn run(&self, range: &CodeRange, output_dir: &Path) -> Result<CrawlReport> {
        self.file_system.create_dir_all(output_dir).await?;
        info!(output = %output_dir.display(), codes = range.len(), "Starting crawl");

        let queue: WorkQueue = Arc::new(Mutex::new(range.iter()));
        let (tx, mut rx) = mpsc::channel(self.settings.concurrency);

        let handles: Vec<_> = (0..self.settings.concurrency)
            .map(|worker_id| {
                let worker = FetchWorker {
                    http_client: Arc::clone(&self.http_client),
                    file_system: Arc::clone(&self.file_system),
                    validator: Arc::clone(&self.validator),
                    settings: Arc::clone(&self.settings),
                    output_dir: output_dir.to_path_buf(),
                };
                tokio::spawn(worker.run(worker_id, Arc::clone(&queue), tx.clone()))
            })
            .collect();

        // Workers hold the only remaining senders
        drop(tx);

        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Fetch worker panicked");
            }
        }

        let report = CrawlReport::new(output_dir, outcomes);
        info!(
            attempted = report.attempted(),
            succeeded = report.succeeded(),
            rejected = report.rejected(),
            failed = report.failed(),
            "Crawl finished"
        );

        Ok(report)
    }
}

/// State owned by one spawned worker
struct FetchWorker {
    http_client: Arc<dyn HttpClient>,
    file_system: Arc<dyn FileSystemAccess>,
    validator: Arc<ContentValidator>,
    settings: Arc<CrawlSettings>,
    output_dir: PathBuf,
}

impl FetchWorker {
    async fn run(self, worker_id: usize, queue: WorkQueue, results: mpsc::Sender<FetchOutcome>) {
        let mut handled = 0usize;

        loop {
            let next = queue.lock().await.next();
            let Some(code) = next else {
                break;
            };

            let outcome = match AssertUnwindSafe(self.fetch(code)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(worker_id, code = %code, "Fetch panicked");
                    FetchOutcome::NetworkFailure {
                        code,
                        cause: "worker panicked".to_string(),
                    }
                }
            };
            handled += 1;

            if results.send(outcome).await.is_err() {
                warn!(worker_id, "Result collector closed, stopping worker");
                break;
            }
        }

        debug!(worker_id, handled, "Fetch worker finished");
    }

    #[instrument(skip_all, fields(code = %code))]
    async fn fetch(&self, code: ImageCode) -> FetchOutcome {
        let url = self.settings.endpoint_for(&code.code());
        let request = HttpRequest::get(url).timeout(self.settings.request_timeout);

        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Request failed");
                return FetchOutcome::NetworkFailure {
                    code,
                    cause: e.to_string(),
                };
            }
        };

        if !response.is_success() {
            warn!(status = response.status, "Unexpected HTTP status");
            return FetchOutcome::NetworkFailure {
                code,
                cause: format!("HTTP status {}", response.status),
            };
        }

        if let Validation::Invalid(reason) = self
            .validator
            .validate(&response.body, &response.text_lossy())
        {
            debug!(
                %reason,
                size = response.body.len(),
                content_type = response.header("content-type").unwrap_or("-"),
                "Rejected response content"
            );
            return FetchOutcome::RejectedContent { code, reason };
        }

        let path = self.output_dir.join(code.file_name());
        let size = response.body.len();

        match self.file_system.write_file(&path, response.body).await {
            Ok(()) => {
                debug!(file = %strip_path(&path.to_string_lossy()), size, "Saved image");
                FetchOutcome::Success {
                    code,
                    bytes: size,
                    path,
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to save image");
                FetchOutcome::StorageFailure {
                    code,
                    cause: e.to_string(),
                }
            }
        }
    }
}
