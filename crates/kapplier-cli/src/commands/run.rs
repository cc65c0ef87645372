//! Run command - apply every target once

use std::path::Path;
use std::sync::Arc;

use kapplier_core::ApplierConfig;
use kapplier_kube::{ClusterClient, PrometheusReporter, RunReport, Runner};
use miette::IntoDiagnostic;

use crate::display::ReportDisplay;
use crate::error::{CliError, Result};
use crate::util;

/// Run the run command
pub async fn run(config: &ApplierConfig, output_json: bool, verbose: bool) -> Result<()> {
    let reporter = Arc::new(PrometheusReporter::new()?);
    let runner = util::build_runner(config, reporter.clone()).await?;

    let report = run_and_record(&runner, &reporter, config.metrics_file.as_deref()).await?;

    if output_json {
        let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{}", json);
    } else {
        print!("{}", ReportDisplay::new(&report, verbose));
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::targets_failed(
            report.outcome.failures.len(),
            report.outcome.total(),
        ))
    }
}

/// One run, then the metrics file.
///
/// The file is written before a run error is returned so the failed run's
/// latency sample is exported too.
async fn run_and_record<C: ClusterClient>(
    runner: &Runner<C, Arc<PrometheusReporter>>,
    reporter: &PrometheusReporter,
    metrics_file: Option<&Path>,
) -> Result<RunReport> {
    let result = runner.run_once().await;

    if let Some(path) = metrics_file {
        util::write_metrics(reporter, path)?;
    }
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use kapplier_kube::{BatchApplier, MockClusterClient};
    use tempfile::TempDir;

    fn runner(
        client: MockClusterClient,
        repo: &Path,
        reporter: &Arc<PrometheusReporter>,
    ) -> Runner<MockClusterClient, Arc<PrometheusReporter>> {
        Runner::new(BatchApplier::new(client, reporter.clone()), repo)
    }

    #[tokio::test]
    async fn test_failed_run_still_writes_metrics() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("repo").join("team-a")).unwrap();
        let metrics = temp.path().join("kapplier.prom");
        let reporter = Arc::new(PrometheusReporter::new().unwrap());
        let client = MockClusterClient::new().with_annotation_failure("unreachable");
        let runner = runner(client, &temp.path().join("repo"), &reporter);

        let err = run_and_record(&runner, &reporter, Some(&metrics))
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), exit_codes::CLUSTER_ERROR);
        let text = std::fs::read_to_string(&metrics).unwrap();
        assert!(text.contains(r#"run_latency_seconds_count{success="false"} 1"#));
    }

    #[tokio::test]
    async fn test_successful_run_writes_metrics() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("repo").join("team-a")).unwrap();
        let metrics = temp.path().join("kapplier.prom");
        let reporter = Arc::new(PrometheusReporter::new().unwrap());
        let runner = runner(MockClusterClient::new(), &temp.path().join("repo"), &reporter);

        let report = run_and_record(&runner, &reporter, Some(&metrics))
            .await
            .unwrap();

        assert!(report.is_success());
        let text = std::fs::read_to_string(&metrics).unwrap();
        assert!(text.contains(r#"run_latency_seconds_count{success="true"} 1"#));
    }

    #[tokio::test]
    async fn test_no_metrics_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("team-a")).unwrap();
        let reporter = Arc::new(PrometheusReporter::new().unwrap());
        let runner = runner(MockClusterClient::new(), temp.path(), &reporter);

        assert!(run_and_record(&runner, &reporter, None).await.is_ok());
    }
}
