//! Reconciliation runs
//!
//! A run discovers the targets of the manifest repository, hands them to the
//! [`BatchApplier`] and reports the outcome. [`Runner::run_periodically`]
//! repeats runs on a fixed interval until told to stop.

use std::future::Future;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use kapplier_core::{ApplyAttempt, BatchOutcome, Target, discover_targets};
use serde::Serialize;

use crate::batch::BatchApplier;
use crate::client::ClusterClient;
use crate::error::Result;
use crate::metrics::Reporter;

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    #[serde(serialize_with = "serialize_seconds")]
    pub latency: Duration,
    pub dry_run: bool,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

fn serialize_seconds<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn summary(&self) -> String {
        self.outcome.summary()
    }
}

/// Runs batches over the targets of a manifest repository
pub struct Runner<C, R> {
    applier: BatchApplier<C, R>,
    repo_path: PathBuf,
    namespaces: Vec<String>,
}

impl<C: ClusterClient, R: Reporter> Runner<C, R> {
    pub fn new(applier: BatchApplier<C, R>, repo_path: impl Into<PathBuf>) -> Self {
        Self {
            applier,
            repo_path: repo_path.into(),
            namespaces: Vec::new(),
        }
    }

    /// Only apply directories named after these namespaces
    pub fn with_namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn applier(&self) -> &BatchApplier<C, R> {
        &self.applier
    }

    /// Targets the next run would apply
    pub fn discover(&self) -> Result<Vec<Target>> {
        Ok(discover_targets(&self.repo_path, &self.namespaces)?)
    }

    /// Discover, apply and report once
    pub async fn run_once(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        let timer = Instant::now();

        let result = match self.discover() {
            Ok(targets) => {
                tracing::info!(targets = targets.len(), repo = %self.repo_path.display(), "starting run");
                self.applier.apply(&targets).await
            }
            Err(e) => Err(e),
        };

        let latency = timer.elapsed();
        let reporter = self.applier.reporter();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                reporter.run_latency(latency.as_secs_f64(), false);
                return Err(e);
            }
        };

        reporter.run_latency(latency.as_secs_f64(), outcome.is_success());
        let attempts: Vec<ApplyAttempt> = outcome.attempts().cloned().collect();
        reporter.result_summary(&attempts);

        tracing::info!(
            succeeded = outcome.successes.len(),
            failed = outcome.failures.len(),
            skipped = outcome.skipped.len(),
            latency_ms = latency.as_millis() as u64,
            "run finished"
        );

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            latency,
            dry_run: self.applier.dry_run(),
            outcome,
        })
    }

    /// Start a run every `interval` until `shutdown` completes or `on_run`
    /// breaks. Runs never overlap; a run longer than the interval delays the
    /// next one.
    pub async fn run_periodically<S, F>(&self, interval: Duration, shutdown: S, mut on_run: F)
    where
        S: Future<Output = ()>,
        F: FnMut(&Result<RunReport>) -> ControlFlow<()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, stopping");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let result = self.run_once().await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "run failed");
            }
            if on_run(&result).is_break() {
                return;
            }
        }
    }
}
