//! Batch apply orchestration
//!
//! [`BatchApplier::apply`] runs one pass over a list of targets:
//!
//! 1. Fetch the annotations of every namespace involved, in one batch. If
//!    this fails nothing is applied and the error is returned.
//! 2. Walk the targets in order, resolving each target's policy from the
//!    fetched annotations.
//! 3. Skip disabled targets and targets with an invalid policy.
//! 4. Apply the rest one after the other, sorting each attempt into
//!    successes or failures. A failed target never stops the batch.
//!
//! ```text
//! Pending ─┬─> Skipped(disabled)
//!          ├─> Skipped(invalid policy)
//!          └─> Attempted ─┬─> Succeeded
//!                         └─> Failed
//! ```

use kapplier_core::{
    ApplyAttempt, BatchOutcome, SkipReason, SkippedTarget, Target, policy, unique_namespaces,
};

use crate::client::{ApplyRequest, ClusterClient};
use crate::error::Result;
use crate::metrics::Reporter;

/// Applies a list of targets through a [`ClusterClient`]
pub struct BatchApplier<C, R> {
    client: C,
    reporter: R,
    /// Run-level dry-run, OR'd with each namespace's annotation
    dry_run: bool,
}

impl<C: ClusterClient, R: Reporter> BatchApplier<C, R> {
    pub fn new(client: C, reporter: R) -> Self {
        Self {
            client,
            reporter,
            dry_run: false,
        }
    }

    /// Dry-run every target of every batch
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Apply `targets` in order.
    ///
    /// Only a failure to fetch namespace annotations is returned as an
    /// error; per-target failures end up in [`BatchOutcome::failures`].
    pub async fn apply(&self, targets: &[Target]) -> Result<BatchOutcome> {
        let namespaces = unique_namespaces(targets);
        let annotations = self
            .client
            .namespace_annotations_batch(&namespaces)
            .await
            .inspect_err(|e| {
                tracing::error!(namespaces = namespaces.len(), error = %e, "could not fetch namespace annotations, aborting run");
            })?;

        let mut outcome = BatchOutcome::default();

        for target in targets {
            let namespace = target.namespace();
            let namespace_annotations = annotations.get(namespace).cloned().unwrap_or_default();

            let policy = match policy::resolve(self.dry_run, &namespace_annotations) {
                Ok(policy) => policy,
                Err(e) => {
                    tracing::warn!(path = %target, namespace, error = %e, "skipping target with invalid policy");
                    outcome.skipped.push(SkippedTarget {
                        target: target.id.clone(),
                        reason: SkipReason::InvalidPolicy(e.to_string()),
                    });
                    continue;
                }
            };

            if !policy.enabled {
                tracing::info!(path = %target, namespace, "skipping disabled target");
                outcome.skipped.push(SkippedTarget {
                    target: target.id.clone(),
                    reason: SkipReason::Disabled,
                });
                continue;
            }

            let request = ApplyRequest {
                path: target.id.clone(),
                namespace: namespace.to_string(),
                dry_run: policy.dry_run,
                prune: policy.prune,
                kustomize: target.kustomize,
            };

            tracing::info!(
                path = %target,
                namespace,
                dry_run = policy.dry_run,
                prune = policy.prune,
                kustomize = target.kustomize,
                "applying"
            );

            match self.client.apply(&request).await {
                Ok(out) => {
                    tracing::info!(path = %target, command = %out.command, "apply succeeded");
                    tracing::debug!(path = %target, output = %out.output);
                    self.reporter.namespace_apply(&target.id, true);
                    outcome
                        .successes
                        .push(ApplyAttempt::success(&target.id, out.command, out.output));
                }
                Err(e) => {
                    tracing::warn!(path = %target, command = %e.command, error = %e, "apply failed");
                    tracing::debug!(path = %target, output = %e.output);
                    self.reporter.namespace_apply(&target.id, false);
                    let message = e.to_string();
                    outcome
                        .failures
                        .push(ApplyAttempt::failure(&target.id, e.command, e.output, message));
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::RecordingReporter;
    use crate::mock::MockClusterClient;
    use kapplier_core::NamespaceAnnotations;

    fn targets(ids: &[&str]) -> Vec<Target> {
        ids.iter().map(|id| Target::new(*id)).collect()
    }

    fn enabled() -> NamespaceAnnotations {
        NamespaceAnnotations::from_raw("true", "", "")
    }

    fn success(id: &str) -> ApplyAttempt {
        ApplyAttempt::success(id, format!("cmd {}", id), format!("output {}", id))
    }

    fn failure(id: &str) -> ApplyAttempt {
        ApplyAttempt::failure(
            id,
            format!("cmd {}", id),
            format!("output {}", id),
            format!("error {}", id),
        )
    }

    fn applier(client: MockClusterClient) -> BatchApplier<MockClusterClient, RecordingReporter> {
        BatchApplier::new(client, RecordingReporter::new())
    }

    #[tokio::test]
    async fn test_empty_target_list() {
        let applier = applier(MockClusterClient::new());
        let outcome = applier.apply(&[]).await.unwrap();

        assert_eq!(outcome, BatchOutcome::default());
        assert_eq!(applier.client().operation_counts().applies, 0);
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let client = MockClusterClient::new()
            .with_namespace("file1", enabled())
            .with_namespace("file2", enabled())
            .with_namespace("file3", enabled());
        let applier = applier(client);

        let outcome = applier.apply(&targets(&["file1", "file2", "file3"])).await.unwrap();

        assert_eq!(
            outcome.successes,
            vec![success("file1"), success("file2"), success("file3")]
        );
        assert!(outcome.failures.is_empty());
        assert_eq!(
            applier.reporter().namespace_applies(),
            vec![
                ("file1".to_string(), true),
                ("file2".to_string(), true),
                ("file3".to_string(), true)
            ]
        );
    }

    #[tokio::test]
    async fn test_all_fail() {
        let client = MockClusterClient::new()
            .with_apply_failure("file1", "error file1")
            .with_apply_failure("file2", "error file2");
        let applier = applier(client);

        let outcome = applier.apply(&targets(&["file1", "file2"])).await.unwrap();

        assert!(outcome.successes.is_empty());
        assert_eq!(outcome.failures, vec![failure("file1"), failure("file2")]);
        assert_eq!(applier.client().operation_counts().applies, 2);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_order() {
        let client = MockClusterClient::new()
            .with_apply_failure("file2", "error file2")
            .with_apply_failure("file4", "error file4");
        let applier = applier(client);

        let outcome = applier
            .apply(&targets(&["file1", "file2", "file3", "file4"]))
            .await
            .unwrap();

        assert_eq!(outcome.successes, vec![success("file1"), success("file3")]);
        assert_eq!(outcome.failures, vec![failure("file2"), failure("file4")]);
        let applied: Vec<_> = applier.client().applied().into_iter().map(|r| r.path).collect();
        assert_eq!(applied, vec!["file1", "file2", "file3", "file4"]);
    }

    #[tokio::test]
    async fn test_middle_failure_scenario() {
        let client = MockClusterClient::new()
            .with_namespace("a", enabled())
            .with_namespace("b", enabled())
            .with_namespace("c", enabled())
            .with_apply_failure("b", "error b");
        let applier = applier(client);

        let outcome = applier.apply(&targets(&["a", "b", "c"])).await.unwrap();

        assert_eq!(outcome.successes, vec![success("a"), success("c")]);
        assert_eq!(outcome.failures, vec![failure("b")]);
    }

    #[tokio::test]
    async fn test_run_dry_run_applies_to_all() {
        let applier = applier(MockClusterClient::new()).with_dry_run(true);

        applier.apply(&targets(&["file1", "file2"])).await.unwrap();

        assert!(applier.client().applied().iter().all(|r| r.dry_run));
    }

    #[tokio::test]
    async fn test_namespace_dry_run_with_prefixed_targets() {
        let client = MockClusterClient::new()
            .with_namespace("file1", NamespaceAnnotations::from_raw("true", "true", ""))
            .with_namespace("file2", enabled())
            .with_namespace("file3", NamespaceAnnotations::from_raw("true", "true", ""));
        let applier = applier(client);

        let outcome = applier
            .apply(&targets(&["repo/file1", "file2", "repo/file3"]))
            .await
            .unwrap();

        assert_eq!(
            outcome.successes,
            vec![success("repo/file1"), success("file2"), success("repo/file3")]
        );
        let applied = applier.client().applied();
        assert_eq!(applied[0].namespace, "file1");
        assert!(applied[0].dry_run);
        assert!(!applied[1].dry_run);
        assert_eq!(applied[2].path, "repo/file3");
        assert_eq!(applied[2].namespace, "file3");
        assert!(applied[2].dry_run);
    }

    #[tokio::test]
    async fn test_run_dry_run_cannot_be_disabled_by_namespace() {
        let client = MockClusterClient::new()
            .with_namespace("file1", NamespaceAnnotations::from_raw("true", "false", ""));
        let applier = applier(client).with_dry_run(true);

        applier.apply(&targets(&["file1"])).await.unwrap();

        assert!(applier.client().applied()[0].dry_run);
    }

    #[tokio::test]
    async fn test_disabled_namespaces_are_skipped() {
        let client = MockClusterClient::new()
            .with_namespace("file1", NamespaceAnnotations::from_raw("false", "", ""))
            .with_namespace("file2", enabled())
            .with_namespace("file3", NamespaceAnnotations::from_raw("false", "", ""));
        let applier = applier(client);

        let outcome = applier.apply(&targets(&["file1", "file2", "file3"])).await.unwrap();

        assert_eq!(outcome.successes, vec![success("file2")]);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].reason, SkipReason::Disabled);
        assert_eq!(applier.client().operation_counts().applies, 1);
        assert_eq!(applier.reporter().namespace_applies().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_enabled_annotation_is_skipped() {
        let client = MockClusterClient::new()
            .with_namespace("file1", NamespaceAnnotations::from_raw("unsupportedOption", "", ""))
            .with_namespace("file2", enabled())
            .with_namespace("file3", NamespaceAnnotations::from_raw("maybe", "", ""));
        let applier = applier(client);

        let outcome = applier.apply(&targets(&["file1", "file2", "file3"])).await.unwrap();

        assert_eq!(outcome.successes, vec![success("file2")]);
        assert!(outcome.failures.is_empty());
        assert_eq!(
            outcome.skipped,
            vec![
                SkippedTarget {
                    target: "file1".to_string(),
                    reason: SkipReason::InvalidPolicy(
                        "unsupported enabled value \"unsupportedOption\"".to_string()
                    ),
                },
                SkippedTarget {
                    target: "file3".to_string(),
                    reason: SkipReason::InvalidPolicy(
                        "unsupported enabled value \"maybe\"".to_string()
                    ),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_no_annotations_applies_with_defaults() {
        let applier = applier(MockClusterClient::new());

        let outcome = applier.apply(&targets(&["solo"])).await.unwrap();

        assert_eq!(outcome.successes.len(), 1);
        assert_eq!(
            applier.client().applied(),
            vec![ApplyRequest {
                path: "solo".to_string(),
                namespace: "solo".to_string(),
                dry_run: false,
                prune: false,
                kustomize: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_prune_and_kustomize_are_forwarded() {
        let client = MockClusterClient::new()
            .with_namespace("ns", NamespaceAnnotations::from_raw("", "", "true"));
        let applier = applier(client);

        applier
            .apply(&[Target::new("repo/ns").with_kustomize(true)])
            .await
            .unwrap();

        let request = &applier.client().applied()[0];
        assert!(request.prune);
        assert!(request.kustomize);
    }

    #[tokio::test]
    async fn test_annotation_fetch_failure_aborts_before_apply() {
        let client = MockClusterClient::new().with_annotation_failure("connection refused");
        let applier = applier(client);

        let result = applier.apply(&targets(&["a", "b", "c"])).await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
        let counts = applier.client().operation_counts();
        assert_eq!(counts.annotation_batches, 1);
        assert_eq!(counts.applies, 0);
        assert!(applier.reporter().events().is_empty());
    }

    #[tokio::test]
    async fn test_annotations_fetched_once_per_batch() {
        let applier = applier(MockClusterClient::new());

        applier
            .apply(&targets(&["repo/a", "a", "b", "other/b", "c"]))
            .await
            .unwrap();

        let counts = applier.client().operation_counts();
        assert_eq!(counts.annotation_batches, 1);
        assert_eq!(counts.annotation_gets, 0);
        assert_eq!(counts.applies, 5);
    }

    #[tokio::test]
    async fn test_every_target_accounted_for() {
        let client = MockClusterClient::new()
            .with_namespace("off", NamespaceAnnotations::from_raw("false", "", ""))
            .with_namespace("bad", NamespaceAnnotations::from_raw("yes", "", ""))
            .with_apply_failure("broken", "error broken");
        let applier = applier(client);
        let list = targets(&["ok", "off", "bad", "broken", "ok2"]);

        let outcome = applier.apply(&list).await.unwrap();

        assert_eq!(outcome.total(), list.len());
        assert!(outcome.successes.len() + outcome.failures.len() <= list.len());
        assert_eq!(outcome.skipped.len(), 2);
    }
}
