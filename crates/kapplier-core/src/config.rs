//! Runner configuration
//!
//! Loaded from a YAML file (by default `~/.config/kapplier/config.yaml`),
//! every field optional:
//!
//! ```yaml
//! repoPath: /src/manifests
//! interval: 5m
//! dryRun: false
//! applyTimeout: 10m
//! server: https://10.0.0.1:6443
//! metricsFile: /var/lib/node-exporter/kapplier.prom
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Default location of the service-account token inside a pod
pub const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Default location of the generated kubeconfig
pub const DEFAULT_KUBECONFIG_PATH: &str = "/etc/kubeconfig";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplierConfig {
    /// Root of the manifest repository
    pub repo_path: PathBuf,

    /// Restrict runs to these namespaces (empty: all directories)
    pub namespaces: Vec<String>,

    /// Time between the start of two runs
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Dry-run every namespace
    pub dry_run: bool,

    /// Upper bound for a single `kubectl apply`
    #[serde(with = "humantime_serde")]
    pub apply_timeout: Option<Duration>,

    /// kubectl executable
    pub kubectl: String,

    /// API server address; when set a kubeconfig is generated for it
    pub server: Option<String>,

    /// Custom kubeconfig template (minijinja), built-in template otherwise
    pub kubeconfig_template: Option<PathBuf>,

    /// Where the generated kubeconfig is written
    pub kubeconfig_path: PathBuf,

    /// Service-account token rendered into the kubeconfig
    pub token_path: PathBuf,

    /// Write Prometheus text exposition here after every run
    pub metrics_file: Option<PathBuf>,
}

impl Default for ApplierConfig {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("/src"),
            namespaces: Vec::new(),
            interval: Duration::from_secs(5 * 60),
            dry_run: false,
            apply_timeout: None,
            kubectl: "kubectl".to_string(),
            server: None,
            kubeconfig_template: None,
            kubeconfig_path: PathBuf::from(DEFAULT_KUBECONFIG_PATH),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            metrics_file: None,
        }
    }
}

impl ApplierConfig {
    /// Load configuration from the default location, defaults if absent
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Default configuration path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kapplier").join("config.yaml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(CoreError::InvalidConfig {
                message: "interval must be greater than zero".to_string(),
            });
        }
        if self.kubectl.trim().is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "kubectl executable must not be empty".to_string(),
            });
        }
        if matches!(self.apply_timeout, Some(t) if t.is_zero()) {
            return Err(CoreError::InvalidConfig {
                message: "applyTimeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
