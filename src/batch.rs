//! Drives planned downloads through a [`Fetch`] with bounded concurrency.
//!
//! Outcomes are reported in plan order whatever order the fetches finish in.
//! A failing item never stops the batch; only cancellation or a run of disk
//! errors does, and then the remaining items are reported as skipped.

use std::{
    collections::HashSet,
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use futures::{stream, StreamExt};
use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    download::{Fetch, FetchError},
    enumerate::{LocalArtifact, PlannedDownload, RemoteResource},
};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Fetches in flight at once
    pub concurrency: usize,
    /// Disk errors in a row, with no other attempted download in between,
    /// after which the batch gives up
    pub max_consecutive_io_errors: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_consecutive_io_errors: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Stopped by the operator
    Cancelled,
    /// Stopped after too many disk errors
    Aborted,
    /// Same local path already planned earlier in the batch
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Success(u64),
    HttpError(u16),
    Transport(String),
    IoError(String),
    MissingDirectory,
    Skipped(SkipReason),
}

impl DownloadStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadStatus::Success(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DownloadStatus::Skipped(_))
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success() && !self.is_skipped()
    }
}

impl From<Result<u64, FetchError>> for DownloadStatus {
    fn from(result: Result<u64, FetchError>) -> Self {
        match result {
            Ok(bytes) => DownloadStatus::Success(bytes),
            Err(FetchError::DirectoryNotFound(_)) => DownloadStatus::MissingDirectory,
            Err(FetchError::Http { status, .. }) => DownloadStatus::HttpError(status),
            Err(FetchError::Timeout) => DownloadStatus::Transport("timed out".to_string()),
            Err(FetchError::Transport(message)) => DownloadStatus::Transport(message),
            Err(FetchError::Io(err)) => DownloadStatus::IoError(err.to_string()),
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Success(bytes) => write!(f, "ok ({bytes} bytes)"),
            DownloadStatus::HttpError(code) => write!(f, "http {code}"),
            DownloadStatus::Transport(message) => write!(f, "transport: {message}"),
            DownloadStatus::IoError(message) => write!(f, "io: {message}"),
            DownloadStatus::MissingDirectory => write!(f, "destination directory missing"),
            DownloadStatus::Skipped(reason) => write!(f, "skipped ({reason:?})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    pub resource: RemoteResource,
    pub artifact: LocalArtifact,
    pub status: DownloadStatus,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// One outcome per planned item, in plan order
    pub outcomes: Vec<DownloadOutcome>,
    /// Set when the batch stopped itself
    pub aborted: Option<String>,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len() - self.skipped()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_failure()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_skipped()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failure())
    }

    pub fn failed_urls(&self) -> Vec<&str> {
        self.failures().map(|o| o.resource.url.as_str()).collect()
    }

    /// Writes the failed URLs, one per line, for a later retry.
    pub fn write_failed_urls(&self, path: &Path) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for url in self.failed_urls() {
            writeln!(writer, "{url}")?;
        }
        writer.flush()
    }
}

/// Downloads every planned item, collecting one outcome per item.
pub async fn run_batch<F, I>(
    fetcher: &F,
    plan: I,
    config: &BatchConfig,
    cancel: &CancellationToken,
    progress: &ProgressBar,
) -> BatchReport
where
    F: Fetch + ?Sized,
    I: IntoIterator<Item = PlannedDownload>,
{
    let mut seen = HashSet::new();

    let mut outcomes = stream::iter(plan.into_iter().map(|planned| {
        let duplicate = !seen.insert(planned.artifact.path());
        let token = cancel.clone();

        async move {
            let status = if duplicate {
                warn!(url = %planned.resource.url, "Duplicate destination, skipping");
                DownloadStatus::Skipped(SkipReason::Duplicate)
            } else if token.is_cancelled() {
                DownloadStatus::Skipped(SkipReason::Cancelled)
            } else {
                let result = fetcher.fetch(&planned.resource, &planned.artifact).await;
                if let Err(err) = &result {
                    warn!(
                        url = %planned.resource.url,
                        error = %err,
                        retryable = err.is_transient(),
                        "Download failed"
                    );
                    if let FetchError::Http { body, .. } = err {
                        debug!(url = %planned.resource.url, body = %body, "Server response");
                    }
                }
                result.into()
            };

            DownloadOutcome {
                resource: planned.resource,
                artifact: planned.artifact,
                status,
            }
        }
    }))
    .buffered(config.concurrency.max(1));

    let mut report = BatchReport::default();
    let mut consecutive_io_errors = 0;

    while let Some(mut outcome) = outcomes.next().await {
        match &outcome.status {
            DownloadStatus::IoError(message) => {
                consecutive_io_errors += 1;
                if consecutive_io_errors >= config.max_consecutive_io_errors
                    && report.aborted.is_none()
                {
                    let reason = format!(
                        "{consecutive_io_errors} consecutive disk errors, last: {message}"
                    );
                    error!(reason = %reason, "Aborting batch");
                    report.aborted = Some(reason);
                    cancel.cancel();
                }
            }
            DownloadStatus::Skipped(_) => {}
            _ => consecutive_io_errors = 0,
        }

        if report.aborted.is_some()
            && outcome.status == DownloadStatus::Skipped(SkipReason::Cancelled)
        {
            outcome.status = DownloadStatus::Skipped(SkipReason::Aborted);
        }

        progress.inc(1);
        report.outcomes.push(outcome);
    }

    info!(
        attempted = report.attempted(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        skipped = report.skipped(),
        "Batch complete"
    );

    report
}

// -- Tests -------------------------------------------------------------------
