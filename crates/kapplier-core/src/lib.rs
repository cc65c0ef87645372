//! Kapplier Core - Core types for reconciling a manifest tree against a cluster
//!
//! This crate provides the pieces of kapplier that never talk to a cluster:
//! - `Target`: A directory of manifests and the namespace it is applied into
//! - `NamespaceAnnotations`: Typed view of the `kube-applier.io/*` annotations
//! - `Policy`: Resolved enabled / dry-run / prune decision for one target
//! - `ApplyAttempt`: Record of a single apply invocation
//! - `discovery`: Finding targets in a manifest repository
//! - `config`: Runner configuration file

pub mod annotations;
pub mod attempt;
pub mod config;
pub mod discovery;
pub mod error;
pub mod output;
pub mod policy;
pub mod target;

pub use annotations::{AnnotationValue, NamespaceAnnotations};
pub use attempt::{ApplyAttempt, BatchOutcome, SkipReason, SkippedTarget};
pub use config::ApplierConfig;
pub use discovery::{discover_targets, is_kustomization_dir};
pub use error::{CoreError, Result};
pub use output::{ResourceResult, parse_apply_output};
pub use policy::{PRUNE_ALLOWLIST, Policy, PolicyError, resolve};
pub use target::{Target, namespace_of, unique_namespaces};
