//! Apply attempt records
//!
//! One [`ApplyAttempt`] is produced for every enabled target of a batch.
//! Targets that are disabled or carry an invalid policy are recorded as
//! [`SkippedTarget`]s and never appear among successes or failures.

use serde::{Deserialize, Serialize};

/// Result of invoking the apply tool for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyAttempt {
    /// Target identifier
    pub target: String,
    /// Full command line used
    pub command: String,
    /// Combined stdout and stderr
    pub output: String,
    /// Error message, empty on success
    pub error: String,
}

impl ApplyAttempt {
    pub fn success(
        target: impl Into<String>,
        command: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            command: command.into(),
            output: output.into(),
            error: String::new(),
        }
    }

    pub fn failure(
        target: impl Into<String>,
        command: impl Into<String>,
        output: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            command: command.into(),
            output: output.into(),
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

/// Why a target was not attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "message", rename_all = "kebab-case")]
pub enum SkipReason {
    /// `kube-applier.io/enabled: "false"`
    Disabled,
    /// The namespace annotations could not be resolved to a policy
    InvalidPolicy(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::InvalidPolicy(message) => write!(f, "invalid policy: {}", message),
        }
    }
}

/// A target left out of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTarget {
    pub target: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Aggregated result of one batch, every list in target order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub successes: Vec<ApplyAttempt>,
    pub failures: Vec<ApplyAttempt>,
    pub skipped: Vec<SkippedTarget>,
}

impl BatchOutcome {
    /// Check that no attempted target failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of targets the batch was given
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len() + self.skipped.len()
    }

    /// All attempts, successes first
    pub fn attempts(&self) -> impl Iterator<Item = &ApplyAttempt> {
        self.successes.iter().chain(self.failures.iter())
    }

    /// Format as human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed, {} skipped",
            self.successes.len(),
            self.failures.len(),
            self.skipped.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_constructors() {
        let ok = ApplyAttempt::success("ns", "kubectl apply", "configmap/a created");
        assert!(ok.is_success());
        assert!(ok.error.is_empty());

        let failed = ApplyAttempt::failure("ns", "kubectl apply", "", "exit status 1");
        assert!(!failed.is_success());
    }

    #[test]
    fn test_outcome_summary() {
        let outcome = BatchOutcome {
            successes: vec![ApplyAttempt::success("a", "cmd a", "out a")],
            failures: vec![ApplyAttempt::failure("b", "cmd b", "out b", "boom")],
            skipped: vec![SkippedTarget {
                target: "c".to_string(),
                reason: SkipReason::Disabled,
            }],
        };

        assert_eq!(outcome.total(), 3);
        assert!(!outcome.is_success());
        assert_eq!(outcome.summary(), "1 succeeded, 1 failed, 1 skipped");
        let targets: Vec<_> = outcome.attempts().map(|a| a.target.as_str()).collect();
        assert_eq!(targets, vec!["a", "b"]);
    }

    #[test]
    fn test_skipped_target_serialization() {
        let skipped = SkippedTarget {
            target: "ns".to_string(),
            reason: SkipReason::InvalidPolicy("unsupported enabled value \"maybe\"".to_string()),
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["target"], "ns");
        assert_eq!(json["reason"], "invalid-policy");
        assert_eq!(json["message"], "unsupported enabled value \"maybe\"");
    }
}
