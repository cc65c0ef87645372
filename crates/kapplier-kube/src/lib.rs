//! Kapplier Kube - Kubernetes integration for kapplier
//!
//! This crate provides:
//! - **Cluster Client**: `ClusterClient` trait with a kubectl-backed implementation and an in-memory mock
//! - **Batch Orchestration**: Resolve the policy of every target and apply them in order
//! - **Runner**: Discover targets in the manifest repository and run batches periodically
//! - **Metrics**: Injected `Reporter` with a Prometheus implementation
//! - **Kubeconfig**: Render a kubeconfig for an explicit API server

pub mod batch;
pub mod client;
pub mod error;
pub mod kubeconfig;
pub mod kubectl;
pub mod metrics;
pub mod mock;
pub mod runner;

pub use batch::BatchApplier;
pub use client::{ApplyOutput, ApplyRequest, ClusterClient};
pub use error::{ApplyError, KubeError, Result};
pub use kubeconfig::{KubeconfigSettings, client_from_kubeconfig, write_kubeconfig};
pub use kubectl::{KubectlClient, KubectlCommand};
pub use metrics::{PrometheusReporter, RecordedEvent, RecordingReporter, Reporter};
pub use mock::{MockClusterClient, OperationCounts};
pub use runner::{RunReport, Runner};
