//! This file defines the ghcn-summary binary entry point.

use ghcn_summary::app;
use ghcn_summary::cli::{self, Command, PipelineArgs};
use ghcn_summary::config::PipelineConfig;
use ghcn_summary::error::{log_error_chain, PipelineError};
use ghcn_summary::metrics;
use ghcn_summary::pipeline;
use ghcn_summary::server;
use ghcn_summary::source::HttpSource;
use ghcn_summary::tracing;

use std::process::ExitCode;
use std::sync::Arc;

/// Run the pipeline and report its outcome.
///
/// Returns whether every archive was summarised.
async fn run_pipeline(args: &PipelineArgs) -> Result<bool, PipelineError> {
    let config = PipelineConfig::try_from(args)?;
    ::tracing::info!(?config, "starting pipeline");
    let source = HttpSource::new(&config.base_url, &config.listing_path)?;
    let report = pipeline::run(config, Arc::new(source)).await?;
    for path in &report.written {
        println!("Written to {}", path.display());
    }
    for failure in &report.failures {
        eprintln!("Failed: {}", failure.error);
    }
    Ok(report.is_success())
}

/// Application entry point
#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    tracing::init_tracing();
    if let Err(error) = metrics::register_metrics() {
        log_error_chain(&error);
        return ExitCode::FAILURE;
    }
    let result = match &args.command {
        Command::Pipeline(args) => run_pipeline(args).await,
        Command::Serve(args) => server::serve(args, app::router()).await.map(|_| true),
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            log_error_chain(&error);
            ExitCode::FAILURE
        }
    }
}
