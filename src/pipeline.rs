//! Batch pipeline: list yearly archives, then summarise each one independently.
//!
//! Every archive is handled by its own task, which owns its accumulator and shares no mutable
//! state with other tasks. Processing an archive is all-or-nothing: the summary is only written
//! once the whole table has been aggregated.

use crate::aggregate;
use crate::compression;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::listing;
use crate::metrics::{FILES_PROCESSED, RECORDS_AGGREGATED};
use crate::models::SummaryRecord;
use crate::resource_manager::ResourceManager;
use crate::sink;
use crate::source::ArchiveSource;

use chrono::Utc;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

/// An archive that could not be summarised.
#[derive(Clone, Debug, PartialEq)]
pub struct FileFailure {
    pub file_name: String,
    pub error: String,
}

/// Outcome of a pipeline run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineReport {
    /// Summaries written, sorted by path
    pub written: Vec<PathBuf>,
    /// Archives that failed after all attempts, sorted by file name
    pub failures: Vec<FileFailure>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// State shared read-only by archive tasks.
struct Context<S: ?Sized> {
    config: PipelineConfig,
    resource_manager: ResourceManager,
    source: Arc<S>,
}

/// Await `future`, failing with a timeout error once the configured wait has elapsed.
async fn with_timeout<T, F>(
    config: &PipelineConfig,
    operation: &'static str,
    target: &str,
    future: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    tokio::time::timeout(config.timeout, future)
        .await
        .map_err(|_| PipelineError::Timeout {
            operation,
            target: target.to_string(),
            timeout: config.timeout,
        })?
}

/// Make up to `retries + 1` attempts at a unit of work, returning the first success or the
/// last error.
///
/// # Arguments
///
/// * `retries`: Number of further attempts after a failed one
/// * `subject`: What is being attempted, for logging
/// * `attempt`: Starts a fresh attempt
async fn with_retries<T, F, Fut>(
    retries: u32,
    subject: &str,
    mut attempt: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let attempts = retries.saturating_add(1);
    let mut made = 1;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(error) if made < attempts => {
                tracing::warn!(subject, attempt = made, %error, "attempt failed, retrying");
                made += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Decompress and aggregate one archive and derive its summary.
///
/// This is CPU-bound and should not be run on an async worker thread.
///
/// # Arguments
///
/// * `file_name`: Archive name recorded in the summary
/// * `data`: gzip compressed table
/// * `chunk_size`: Number of rows aggregated at a time
pub fn summarise_archive(
    file_name: &str,
    data: &[u8],
    chunk_size: usize,
) -> Result<SummaryRecord, PipelineError> {
    tracing::info!(file_name, chunk_size, "aggregating archive");
    let accumulator = aggregate::aggregate(compression::gzip_reader(data), chunk_size)?;
    tracing::info!(
        file_name,
        total_rows = accumulator.total_records(),
        "aggregation complete"
    );
    accumulator.into_summary(file_name, Utc::now())
}

/// Download, summarise and write a single archive. Makes one attempt.
///
/// Returns the path of the summary written.
pub async fn process_file<S>(
    source: &S,
    config: &PipelineConfig,
    resource_manager: &ResourceManager,
    file_name: &str,
) -> Result<PathBuf, PipelineError>
where
    S: ArchiveSource + ?Sized,
{
    let data = {
        let _download_permit = resource_manager.download().await?;
        with_timeout(config, "download", file_name, source.download(file_name)).await?
    };
    let file_name = file_name.to_string();
    let chunk_size = config.chunk_size;
    let path = sink::output_path(&config.output_dir, &file_name);
    tokio::task::spawn_blocking(move || {
        let summary = summarise_archive(&file_name, &data, chunk_size)?;
        RECORDS_AGGREGATED.inc_by(summary.total_records);
        sink::write_summary(&summary, &path)
    })
    .await?
}

impl<S: ArchiveSource + ?Sized> Context<S> {
    /// Process an archive, retrying failed attempts up to the configured number of times.
    async fn process_with_retries(&self, file_name: &str) -> Result<PathBuf, PipelineError> {
        let _task_permit = self.resource_manager.task().await?;
        with_retries(self.config.retries, file_name, || {
            process_file(
                self.source.as_ref(),
                &self.config,
                &self.resource_manager,
                file_name,
            )
        })
        .await
        .map_err(|error| error.in_file(file_name))
    }
}

/// Run the pipeline.
///
/// Lists the archives available for the configured years and summarises each of them, at most
/// `concurrency` at a time. Listing and each archive are retried up to `retries` times. Failures
/// of individual archives are collected in the report; only a failure to list archives fails the
/// run as a whole.
///
/// # Arguments
///
/// * `config`: Pipeline configuration
/// * `source`: Where archives are listed and downloaded from
pub async fn run<S>(config: PipelineConfig, source: Arc<S>) -> Result<PipelineReport, PipelineError>
where
    S: ArchiveSource + ?Sized + 'static,
{
    let files = with_retries(config.retries, &config.listing_path, || {
        with_timeout(
            &config,
            "listing",
            &config.listing_path,
            listing::list_files(source.as_ref(), &config.years),
        )
    })
    .await?;
    let mut report = PipelineReport::default();
    if files.is_empty() {
        tracing::warn!(years = ?config.years, "no archives found for the requested years");
        return Ok(report);
    }

    let resource_manager = ResourceManager::new(config.download_limit, Some(config.concurrency));
    let context = Arc::new(Context {
        config,
        resource_manager,
        source,
    });
    let mut tasks = JoinSet::new();
    for file_name in files {
        let context = context.clone();
        tasks.spawn(async move {
            let result = context.process_with_retries(&file_name).await;
            (file_name, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (file_name, result) = joined?;
        match result {
            Ok(path) => {
                FILES_PROCESSED.with_label_values(&["success"]).inc();
                tracing::info!(file_name = %file_name, path = %path.display(), "archive summarised");
                report.written.push(path);
            }
            Err(error) => {
                FILES_PROCESSED.with_label_values(&["failure"]).inc();
                crate::error::log_error_chain(&error);
                report.failures.push(FileFailure {
                    file_name,
                    error: error.to_string(),
                });
            }
        }
    }
    report.written.sort();
    report
        .failures
        .sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(report)
}
