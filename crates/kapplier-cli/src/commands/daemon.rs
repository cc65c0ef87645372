//! Daemon command - apply every target on a fixed interval

use std::ops::ControlFlow;
use std::sync::Arc;

use console::style;
use kapplier_core::ApplierConfig;
use kapplier_kube::PrometheusReporter;

use crate::error::Result;
use crate::util;

/// Run the daemon command until interrupted
pub async fn run(config: &ApplierConfig) -> Result<()> {
    let reporter = Arc::new(PrometheusReporter::new()?);
    let runner = util::build_runner(config, reporter.clone()).await?;

    tracing::info!(
        repo = %config.repo_path.display(),
        interval = %util::format_duration(config.interval),
        dry_run = config.dry_run,
        "starting daemon"
    );

    runner
        .run_periodically(config.interval, shutdown_signal(), |result| {
            if let Ok(report) = result {
                let summary = report.summary();
                if report.is_success() {
                    println!("{} {}", report.finished_at.format("%H:%M:%S"), style(summary).green());
                } else {
                    println!("{} {}", report.finished_at.format("%H:%M:%S"), style(summary).red());
                }
            }

            // Written after failed runs too, so the latency histogram shows them
            if let Some(path) = &config.metrics_file {
                if let Err(e) = util::write_metrics(&reporter, path) {
                    tracing::warn!(path = %path.display(), error = %e, "could not write metrics");
                }
            }
            ControlFlow::Continue(())
        })
        .await;

    tracing::info!("daemon stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, stopping after the current run");
        }
        _ = terminate => {
            tracing::info!("received terminate signal, stopping after the current run");
        }
    }
}
