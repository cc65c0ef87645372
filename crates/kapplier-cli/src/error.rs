//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use kapplier_core::CoreError;
use kapplier_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Configuration file or flags are invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(kapplier::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The cluster could not be reached or queried
    #[error("Cluster error: {message}")]
    #[diagnostic(code(kapplier::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// At least one target failed to apply
    #[error("{failed} of {total} target(s) failed to apply")]
    #[diagnostic(
        code(kapplier::cli::targets_failed),
        help("rerun with --verbose to see the kubectl output of each target")
    )]
    TargetsFailed { failed: usize, total: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(kapplier::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(kapplier::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::TargetsFailed { .. } => exit_codes::TARGETS_FAILED,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a failed-targets error
    pub fn targets_failed(failed: usize, total: usize) -> Self {
        Self::TargetsFailed { failed, total }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RepoNotFound { .. } | CoreError::Io(_) | CoreError::Walk(_) => {
                CliError::Io {
                    message: err.to_string(),
                }
            }
            CoreError::InvalidConfig { .. } | CoreError::YamlParse(_) => {
                CliError::config(err.to_string())
            }
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Core(core) => core.into(),
            KubeError::Io(io) => io.into(),
            KubeError::InvalidConfig(message) => CliError::config(message),
            KubeError::Kubeconfig(message) => CliError::config_with_help(
                message,
                "check the server, tokenPath and kubeconfigTemplate settings",
            ),
            KubeError::Metrics(e) => CliError::Other {
                message: format!("metrics error: {}", e),
            },
            other => CliError::Cluster {
                message: other.to_string(),
                help: Some("check that the cluster is reachable and the service account can read namespaces".to_string()),
            },
        }
    }
}

impl From<miette::Report> for CliError {
    fn from(err: miette::Report) -> Self {
        CliError::Other {
            message: format!("{:?}", err),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
