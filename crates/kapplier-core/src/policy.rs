//! Per-namespace apply policy
//!
//! A [`Policy`] is recomputed on every run from the live annotations of the
//! target namespace combined with the run-level dry-run flag:
//!
//! | annotation | value               | effect                                |
//! |------------|---------------------|---------------------------------------|
//! | enabled    | unset / `"true"`    | target is applied                     |
//! | enabled    | `"false"`           | target is skipped                     |
//! | enabled    | anything else       | [`PolicyError`], target is skipped    |
//! | dry-run    | `"true"`            | dry-run, regardless of the run flag   |
//! | prune      | `"true"`            | prune kinds from [`PRUNE_ALLOWLIST`]  |
//!
//! The dry-run annotation can only turn dry-run on. A run started in dry-run
//! mode stays in dry-run for every namespace.

use serde::Serialize;
use thiserror::Error;

use crate::annotations::{AnnotationValue, NamespaceAnnotations};

/// Resource kinds that may be pruned, as `group/version/Kind`.
///
/// Secrets are deliberately absent.
pub const PRUNE_ALLOWLIST: &[&str] = &[
    "apps/v1/DaemonSet",
    "apps/v1/Deployment",
    "apps/v1/StatefulSet",
    "autoscaling/v1/HorizontalPodAutoscaler",
    "batch/v1/Job",
    "core/v1/ConfigMap",
    "core/v1/Pod",
    "core/v1/Service",
    "core/v1/ServiceAccount",
    "networking.k8s.io/v1beta1/Ingress",
    "networking.k8s.io/v1/NetworkPolicy",
];

/// Effective apply behaviour for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub enabled: bool,
    pub dry_run: bool,
    pub prune: bool,
}

/// Annotation value that cannot be turned into a policy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("unsupported enabled value {value:?}")]
    UnsupportedEnabled { value: String },
}

/// Resolve the policy of a namespace for a run
pub fn resolve(
    run_dry_run: bool,
    annotations: &NamespaceAnnotations,
) -> std::result::Result<Policy, PolicyError> {
    let enabled = match &annotations.enabled {
        AnnotationValue::Unset | AnnotationValue::True => true,
        AnnotationValue::False => false,
        AnnotationValue::Invalid(value) => {
            return Err(PolicyError::UnsupportedEnabled {
                value: value.clone(),
            });
        }
    };

    Ok(Policy {
        enabled,
        dry_run: run_dry_run || annotations.dry_run.is_true(),
        prune: annotations.prune.is_true(),
    })
}
