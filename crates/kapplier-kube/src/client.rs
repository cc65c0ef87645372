//! Cluster client abstraction
//!
//! The batch orchestrator never talks to the cluster directly. Everything it
//! needs goes through [`ClusterClient`]: applying a directory of manifests and
//! reading the kapplier annotations of namespaces.
//!
//! Implementations must be Send + Sync for use across async tasks.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use kapplier_core::NamespaceAnnotations;

use crate::error::{ApplyError, Result};

/// Arguments of a single apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    /// Directory of manifests
    pub path: String,
    /// Namespace to apply into
    pub namespace: String,
    /// Server-side dry-run
    pub dry_run: bool,
    /// Prune allow-listed kinds missing from the manifests
    pub prune: bool,
    /// Apply as a kustomization
    pub kustomize: bool,
}

/// Diagnostics of a successful apply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplyOutput {
    /// Command line that was run
    pub command: String,
    /// Combined stdout and stderr
    pub output: String,
}

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Apply the manifests described by `request`.
    ///
    /// Command and output are populated whether or not the apply succeeds.
    /// After a timeout the output holds what was written before it.
    async fn apply(&self, request: &ApplyRequest) -> std::result::Result<ApplyOutput, ApplyError>;

    /// Read the kapplier annotations of one namespace
    async fn namespace_annotations(&self, namespace: &str) -> Result<NamespaceAnnotations>;

    /// Read the kapplier annotations of several namespaces.
    ///
    /// Must behave like calling [`ClusterClient::namespace_annotations`] once
    /// per namespace and merging the results: any failure fails the whole
    /// batch. Implementations may override this to save round trips.
    async fn namespace_annotations_batch(
        &self,
        namespaces: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, NamespaceAnnotations>> {
        let fetched = futures::future::try_join_all(namespaces.iter().map(|ns| async move {
            self.namespace_annotations(ns)
                .await
                .map(|annotations| (ns.clone(), annotations))
        }))
        .await?;
        Ok(fetched.into_iter().collect())
    }
}
