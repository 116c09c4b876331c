//! Command Line Interface (CLI) arguments.

use clap::{Args, Parser, Subcommand};
use url::Url;
use validator::Validate;

/// ghcn-summary command line interface
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct CommandLineArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Download yearly archives and write a JSON summary for each
    Pipeline(PipelineArgs),
    /// Serve the sum of squares API
    Serve(ServeArgs),
}

/// Arguments of the `pipeline` subcommand
#[derive(Clone, Debug, Args, Validate)]
pub struct PipelineArgs {
    /// Scheme and host of the archive server
    #[arg(
        long,
        default_value = "https://www.ncei.noaa.gov",
        env = "GHCN_SUMMARY_BASE_URL"
    )]
    pub base_url: Url,
    /// Path of the directory containing yearly archives
    #[arg(
        long,
        default_value = "/pub/data/ghcn/daily/by_year/",
        env = "GHCN_SUMMARY_LISTING_PATH"
    )]
    pub listing_path: String,
    /// Comma separated years to summarise
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "2020,2021,2022,2023",
        env = "GHCN_SUMMARY_YEARS"
    )]
    pub years: Vec<i32>,
    /// Directory in which summaries are written
    #[arg(long, default_value = "output", env = "GHCN_SUMMARY_OUTPUT_DIR")]
    pub output_dir: String,
    /// Number of rows aggregated at a time
    #[arg(long, default_value_t = 10_000, env = "GHCN_SUMMARY_CHUNK_SIZE")]
    #[validate(range(min = 1, message = "chunk size must be greater than 0"))]
    pub chunk_size: usize,
    /// Maximum time in seconds to wait for a listing or download to complete
    #[arg(long, default_value_t = 600, env = "GHCN_SUMMARY_TIMEOUT")]
    #[validate(range(min = 1, message = "timeout must be greater than 0"))]
    pub timeout: u64,
    /// Number of times a failed archive is retried
    #[arg(long, default_value_t = 1, env = "GHCN_SUMMARY_RETRIES")]
    pub retries: u32,
    /// Maximum number of archives processed concurrently. Defaults to the number of CPUs.
    #[arg(long, env = "GHCN_SUMMARY_CONCURRENCY")]
    #[validate(range(min = 1, message = "concurrency must be greater than 0"))]
    pub concurrency: Option<usize>,
    /// Maximum number of concurrent downloads. Unlimited if not set.
    #[arg(long, env = "GHCN_SUMMARY_DOWNLOAD_LIMIT")]
    #[validate(range(min = 1, message = "download limit must be greater than 0"))]
    pub download_limit: Option<usize>,
}

/// Arguments of the `serve` subcommand
#[derive(Clone, Debug, Args)]
pub struct ServeArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "GHCN_SUMMARY_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 5001, env = "PORT")]
    pub port: u16,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "GHCN_SUMMARY_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
