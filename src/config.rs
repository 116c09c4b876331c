//! Pipeline configuration.

use crate::aggregate::DEFAULT_CHUNK_SIZE;
use crate::cli::PipelineArgs;
use crate::error::PipelineError;

use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Configuration passed to every pipeline step.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Scheme and host of the archive server
    pub base_url: Url,
    /// Path of the directory containing yearly archives
    pub listing_path: String,
    /// Years to summarise
    pub years: Vec<i32>,
    /// Directory in which summaries are written
    pub output_dir: PathBuf,
    /// Number of rows aggregated at a time
    pub chunk_size: usize,
    /// Maximum wait for a listing or download
    pub timeout: Duration,
    /// Number of times a failed archive is retried
    pub retries: u32,
    /// Maximum number of archives processed concurrently
    pub concurrency: usize,
    /// Optional maximum number of concurrent downloads
    pub download_limit: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://www.ncei.noaa.gov").expect("valid default URL"),
            listing_path: "/pub/data/ghcn/daily/by_year/".to_string(),
            years: vec![2020, 2021, 2022, 2023],
            output_dir: PathBuf::from("output"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: Duration::from_secs(600),
            retries: 1,
            concurrency: default_concurrency(),
            download_limit: None,
        }
    }
}

/// One worker per CPU.
fn default_concurrency() -> usize {
    num_cpus::get().max(1)
}

impl TryFrom<&PipelineArgs> for PipelineConfig {
    type Error = PipelineError;

    /// Validate command line arguments and build a configuration from them.
    fn try_from(args: &PipelineArgs) -> Result<Self, Self::Error> {
        args.validate().map_err(PipelineError::InvalidConfig)?;
        Ok(Self {
            base_url: args.base_url.clone(),
            listing_path: args.listing_path.clone(),
            years: args.years.clone(),
            output_dir: PathBuf::from(&args.output_dir),
            chunk_size: args.chunk_size,
            timeout: Duration::from_secs(args.timeout),
            retries: args.retries,
            concurrency: args.concurrency.unwrap_or_else(default_concurrency),
            download_limit: args.download_limit,
        })
    }
}
