//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Run reports, grouped into succeeded / failed / skipped targets
//! - Discovered targets
//! - Resolved namespace policies

use std::fmt;

use console::style;
use kapplier_core::{ApplyAttempt, NamespaceAnnotations, Policy, PolicyError, Target};
use kapplier_kube::RunReport;

/// Human-readable run report
pub struct ReportDisplay<'a> {
    report: &'a RunReport,
    verbose: bool,
}

impl<'a> ReportDisplay<'a> {
    /// With `verbose`, command and output are shown for successes too
    pub fn new(report: &'a RunReport, verbose: bool) -> Self {
        Self { report, verbose }
    }
}

fn write_details(f: &mut fmt::Formatter<'_>, attempt: &ApplyAttempt) -> fmt::Result {
    writeln!(f, "      {}", style(format!("$ {}", attempt.command)).dim())?;
    for line in attempt.output.lines().filter(|l| !l.trim().is_empty()) {
        writeln!(f, "      {}", line)?;
    }
    Ok(())
}

impl fmt::Display for ReportDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let outcome = &report.outcome;

        writeln!(f, "{}", style("RUN").bold().underlined())?;
        writeln!(
            f,
            "  Started:   {}",
            report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "  Duration:  {:.2}s", report.latency.as_secs_f64())?;
        writeln!(f, "  Dry run:   {}", if report.dry_run { "yes" } else { "no" })?;

        if !outcome.successes.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "{}",
                style(format!("SUCCEEDED ({})", outcome.successes.len())).bold()
            )?;
            for attempt in &outcome.successes {
                writeln!(f, "  {} {}", style("✓").green(), attempt.target)?;
                if self.verbose {
                    write_details(f, attempt)?;
                }
            }
        }

        if !outcome.failures.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "{}",
                style(format!("FAILED ({})", outcome.failures.len())).bold()
            )?;
            for attempt in &outcome.failures {
                writeln!(
                    f,
                    "  {} {}: {}",
                    style("✗").red(),
                    attempt.target,
                    style(&attempt.error).red()
                )?;
                write_details(f, attempt)?;
            }
        }

        if !outcome.skipped.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "{}",
                style(format!("SKIPPED ({})", outcome.skipped.len())).bold()
            )?;
            for skipped in &outcome.skipped {
                writeln!(
                    f,
                    "  {} {}: {}",
                    style("-").yellow(),
                    skipped.target,
                    skipped.reason
                )?;
            }
        }

        writeln!(f)?;
        let summary = outcome.summary();
        if outcome.is_success() {
            writeln!(f, "{}", style(summary).green())
        } else {
            writeln!(f, "{}", style(summary).red())
        }
    }
}

/// Discovered targets, one per line
pub struct TargetsDisplay<'a>(pub &'a [Target]);

impl fmt::Display for TargetsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "{}", style("No targets found").yellow());
        }

        writeln!(
            f,
            "{}",
            style(format!("TARGETS ({})", self.0.len())).bold().underlined()
        )?;

        let width = self.0.iter().map(|t| t.id.len()).max().unwrap_or(0);
        for target in self.0 {
            write!(
                f,
                "  {:<width$}  -> {}",
                target.id,
                style(target.namespace()).cyan(),
                width = width
            )?;
            if target.kustomize {
                write!(f, " {}", style("(kustomize)").dim())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Annotations of one namespace and the policy they resolve to
#[derive(Debug, Clone)]
pub struct PolicyRow {
    pub namespace: String,
    pub annotations: NamespaceAnnotations,
    pub policy: std::result::Result<Policy, PolicyError>,
}

impl PolicyRow {
    /// JSON form used by `policy --json`
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "namespace": self.namespace,
            "annotations": {
                "enabled": self.annotations.enabled.as_str(),
                "dryRun": self.annotations.dry_run.as_str(),
                "prune": self.annotations.prune.as_str(),
            },
        });
        match &self.policy {
            Ok(policy) => value["policy"] = serde_json::json!(policy),
            Err(e) => value["error"] = serde_json::json!(e.to_string()),
        }
        value
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Resolved policies, one namespace per line
pub struct PoliciesDisplay<'a>(pub &'a [PolicyRow]);

impl fmt::Display for PoliciesDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "{}", style("No namespaces to resolve").yellow());
        }

        let width = self
            .0
            .iter()
            .map(|row| row.namespace.len())
            .max()
            .unwrap_or(0)
            .max("NAMESPACE".len());

        writeln!(
            f,
            "{}",
            style(format!(
                "{:<width$}  {:<8} {:<8} {}",
                "NAMESPACE",
                "ENABLED",
                "DRY-RUN",
                "PRUNE",
                width = width
            ))
            .bold()
        )?;

        for row in self.0 {
            match &row.policy {
                Ok(policy) if policy.enabled => writeln!(
                    f,
                    "{:<width$}  {} {:<8} {}",
                    row.namespace,
                    style(format!("{:<8}", "yes")).green(),
                    yes_no(policy.dry_run),
                    yes_no(policy.prune),
                    width = width
                )?,
                Ok(_) => writeln!(
                    f,
                    "{:<width$}  {} {:<8} {}",
                    row.namespace,
                    style(format!("{:<8}", "no")).yellow(),
                    "-",
                    "-",
                    width = width
                )?,
                Err(e) => writeln!(
                    f,
                    "{:<width$}  {}",
                    row.namespace,
                    style(format!("invalid: {}", e)).red(),
                    width = width
                )?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use kapplier_core::{BatchOutcome, SkipReason, SkippedTarget, policy};
    use std::time::Duration;

    fn report() -> RunReport {
        RunReport {
            started_at: Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap(),
            finished_at: Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 1).unwrap(),
            latency: Duration::from_millis(1500),
            dry_run: false,
            outcome: BatchOutcome {
                successes: vec![ApplyAttempt::success(
                    "repo/team-a",
                    "kubectl apply -R -f repo/team-a -n team-a",
                    "configmap/settings created\ndeployment.apps/web unchanged\n",
                )],
                failures: vec![ApplyAttempt::failure(
                    "repo/team-b",
                    "kubectl apply -R -f repo/team-b -n team-b",
                    "error: the server could not find the requested resource\n",
                    "kubectl exited with status 1",
                )],
                skipped: vec![SkippedTarget {
                    target: "repo/team-c".to_string(),
                    reason: SkipReason::Disabled,
                }],
            },
        }
    }

    #[test]
    fn test_report_display() {
        console::set_colors_enabled(false);
        let rendered = ReportDisplay::new(&report(), false).to_string();

        insta::assert_snapshot!(rendered, @r"
        RUN
          Started:   2026-01-01 10:00:00 UTC
          Duration:  1.50s
          Dry run:   no

        SUCCEEDED (1)
          ✓ repo/team-a

        FAILED (1)
          ✗ repo/team-b: kubectl exited with status 1
              $ kubectl apply -R -f repo/team-b -n team-b
              error: the server could not find the requested resource

        SKIPPED (1)
          - repo/team-c: disabled

        1 succeeded, 1 failed, 1 skipped
        ");
    }

    #[test]
    fn test_report_display_verbose_shows_success_output() {
        console::set_colors_enabled(false);
        let rendered = ReportDisplay::new(&report(), true).to_string();

        assert!(rendered.contains("$ kubectl apply -R -f repo/team-a -n team-a"));
        assert!(rendered.contains("      configmap/settings created"));
    }

    #[test]
    fn test_targets_display() {
        console::set_colors_enabled(false);
        let targets = vec![
            Target::new("repo/team-a"),
            Target::new("repo/platform").with_kustomize(true),
        ];

        insta::assert_snapshot!(TargetsDisplay(&targets).to_string(), @r"
        TARGETS (2)
          repo/team-a    -> team-a
          repo/platform  -> platform (kustomize)
        ");
    }

    #[test]
    fn test_policies_display() {
        console::set_colors_enabled(false);
        let row = |namespace: &str, annotations: NamespaceAnnotations| PolicyRow {
            namespace: namespace.to_string(),
            policy: policy::resolve(false, &annotations),
            annotations,
        };
        let rows = vec![
            row("team-a", NamespaceAnnotations::from_raw("", "true", "true")),
            row("team-b", NamespaceAnnotations::from_raw("false", "", "")),
            row("team-c", NamespaceAnnotations::from_raw("maybe", "", "")),
        ];

        insta::assert_snapshot!(PoliciesDisplay(&rows).to_string(), @r#"
        NAMESPACE  ENABLED  DRY-RUN  PRUNE
        team-a     yes      yes      yes
        team-b     no       -        -
        team-c     invalid: unsupported enabled value "maybe"
        "#);
    }

    #[test]
    fn test_policy_row_json() {
        let annotations = NamespaceAnnotations::from_raw("maybe", "", "");
        let row = PolicyRow {
            namespace: "team-c".to_string(),
            policy: policy::resolve(false, &annotations),
            annotations,
        };

        let json = row.to_json();
        assert_eq!(json["annotations"]["enabled"], "maybe");
        assert!(json.get("policy").is_none());
        assert_eq!(json["error"], r#"unsupported enabled value "maybe""#);
    }
}
