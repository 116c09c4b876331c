//! Web server

use crate::cli;
use crate::error::PipelineError;

use std::{net::SocketAddr, str::FromStr, time::Duration};

use axum::Router;
use axum_server::Handle;
use tokio::signal;

/// Serve the sum of squares service
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `router`: The [axum::Router] to serve
pub async fn serve(args: &cli::ServeArgs, router: Router) -> Result<(), PipelineError> {
    let addr = SocketAddr::from_str(&format!("{}:{}", args.host, args.port))?;

    // Catch ctrl+c and try to shutdown gracefully
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(
        handle.clone(),
        args.graceful_shutdown_timeout,
    ));

    tracing::info!(%addr, "starting server");
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .map_err(PipelineError::Server)
}

/// Graceful shutdown handler
///
/// Installs signal handlers to catch Ctrl-C or SIGTERM and trigger a graceful shutdown.
async fn shutdown_signal(handle: Handle, timeout: u64) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
    // Force shutdown if graceful shutdown takes longer than the timeout
    handle.graceful_shutdown(Some(Duration::from_secs(timeout)));
}
