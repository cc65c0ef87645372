//! Error types for kapplier-kube

use thiserror::Error;

/// Result type for kapplier-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while talking to the cluster
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Namespace does not exist
    #[error("namespace '{namespace}' not found")]
    NamespaceNotFound { namespace: String },

    /// kubectl exited with a non-zero status
    #[error("kubectl {}", exit_status(.code))]
    Kubectl { code: Option<i32> },

    /// kubectl could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Apply did not finish in time
    #[error("apply timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Kubeconfig could not be rendered, written or loaded
    #[error("kubeconfig error: {0}")]
    Kubeconfig(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metrics registry error
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Failure reported by a test double
    #[error("{0}")]
    Injected(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Target discovery or configuration failure
    #[error(transparent)]
    Core(#[from] kapplier_core::CoreError),
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl From<minijinja::Error> for KubeError {
    fn from(e: minijinja::Error) -> Self {
        KubeError::Kubeconfig(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 404)
            || matches!(self, KubeError::NamespaceNotFound { .. })
    }

    /// Exit code of a failed kubectl invocation, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            KubeError::Kubectl { code } => *code,
            _ => None,
        }
    }
}

/// A failed apply, with the diagnostics gathered before it failed
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ApplyError {
    /// Command line that was run
    pub command: String,
    /// Combined output collected so far
    pub output: String,
    #[source]
    pub source: KubeError,
}

impl ApplyError {
    pub fn new(command: impl Into<String>, output: impl Into<String>, source: KubeError) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kubectl_error_message() {
        assert_eq!(
            KubeError::Kubectl { code: Some(1) }.to_string(),
            "kubectl exited with status 1"
        );
        assert_eq!(
            KubeError::Kubectl { code: None }.to_string(),
            "kubectl terminated by signal"
        );
    }

    #[test]
    fn test_apply_error_displays_source() {
        let err = ApplyError::new("kubectl apply", "output", KubeError::Injected("boom".into()));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.command, "kubectl apply");
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(KubeError::Kubectl { code: Some(2) }.exit_code(), Some(2));
        assert_eq!(KubeError::Injected("x".into()).exit_code(), None);
    }

    #[test]
    fn test_namespace_not_found_is_not_found() {
        let err = KubeError::NamespaceNotFound {
            namespace: "ns".into(),
        };
        assert!(err.is_not_found());
    }
}
