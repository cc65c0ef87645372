//! Mock cluster client for testing
//!
//! Holds namespace annotations in memory and answers applies from a script,
//! useful for unit tests without requiring a Kubernetes cluster. Every apply
//! request is recorded so tests can assert on arguments and ordering.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use kapplier_core::NamespaceAnnotations;

use crate::client::{ApplyOutput, ApplyRequest, ClusterClient};
use crate::error::{ApplyError, KubeError, Result};

/// In-memory cluster client for testing
#[derive(Clone, Default)]
pub struct MockClusterClient {
    /// namespace -> annotations; unknown namespaces have none
    namespaces: Arc<RwLock<HashMap<String, NamespaceAnnotations>>>,
    /// target path -> error message returned by apply
    apply_failures: Arc<RwLock<HashMap<String, String>>>,
    /// Error message returned by every annotation lookup
    annotation_failure: Arc<RwLock<Option<String>>>,
    /// Apply requests in call order
    applied: Arc<RwLock<Vec<ApplyRequest>>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub applies: usize,
    pub annotation_gets: usize,
    pub annotation_batches: usize,
}

impl MockClusterClient {
    /// Create a mock where every namespace exists without annotations
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the annotations of a namespace
    pub fn with_namespace(self, namespace: &str, annotations: NamespaceAnnotations) -> Self {
        self.namespaces
            .write()
            .unwrap()
            .insert(namespace.to_string(), annotations);
        self
    }

    /// Make the apply of `path` fail with `message`
    pub fn with_apply_failure(self, path: &str, message: &str) -> Self {
        self.apply_failures
            .write()
            .unwrap()
            .insert(path.to_string(), message.to_string());
        self
    }

    /// Make every annotation lookup fail with `message`
    pub fn with_annotation_failure(self, message: &str) -> Self {
        *self.annotation_failure.write().unwrap() = Some(message.to_string());
        self
    }

    /// Apply requests received so far, in order
    pub fn applied(&self) -> Vec<ApplyRequest> {
        self.applied.read().unwrap().clone()
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    fn check_annotation_failure(&self) -> Result<()> {
        match self.annotation_failure.read().unwrap().as_ref() {
            Some(message) => Err(KubeError::Injected(message.clone())),
            None => Ok(()),
        }
    }

    fn lookup(&self, namespace: &str) -> NamespaceAnnotations {
        self.namespaces
            .read()
            .unwrap()
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ClusterClient for MockClusterClient {
    async fn apply(&self, request: &ApplyRequest) -> std::result::Result<ApplyOutput, ApplyError> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.applies += 1;
        }
        self.applied.write().unwrap().push(request.clone());

        let command = format!("cmd {}", request.path);
        let output = format!("output {}", request.path);

        match self.apply_failures.read().unwrap().get(&request.path) {
            Some(message) => Err(ApplyError::new(
                command,
                output,
                KubeError::Injected(message.clone()),
            )),
            None => Ok(ApplyOutput { command, output }),
        }
    }

    async fn namespace_annotations(&self, namespace: &str) -> Result<NamespaceAnnotations> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.annotation_gets += 1;
        }
        self.check_annotation_failure()?;
        Ok(self.lookup(namespace))
    }

    async fn namespace_annotations_batch(
        &self,
        namespaces: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, NamespaceAnnotations>> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.annotation_batches += 1;
        }
        self.check_annotation_failure()?;
        Ok(namespaces
            .iter()
            .map(|ns| (ns.clone(), self.lookup(ns)))
            .collect())
    }
}
