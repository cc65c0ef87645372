//! Shared utility functions for CLI commands

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use kapplier_core::ApplierConfig;
use kapplier_kube::{
    BatchApplier, KubeconfigSettings, KubectlClient, KubectlCommand, PrometheusReporter, Reporter,
    Runner, client_from_kubeconfig, write_kubeconfig,
};

use crate::error::{CliError, Result};

/// Settings that can be given on the command line or through the
/// environment, taking precedence over the config file
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Root of the manifest repository
    #[arg(long, env = "KAPPLIER_REPO_PATH")]
    pub repo_path: Option<PathBuf>,

    /// Only handle these namespaces (repeatable or comma-separated)
    #[arg(short, long = "namespace", value_delimiter = ',')]
    pub namespaces: Vec<String>,

    /// Dry-run every namespace
    #[arg(long, env = "KAPPLIER_DRY_RUN")]
    pub dry_run: bool,

    /// kubectl executable
    #[arg(long, env = "KAPPLIER_KUBECTL")]
    pub kubectl: Option<String>,

    /// API server address; a kubeconfig is generated for it
    #[arg(long, env = "KAPPLIER_SERVER")]
    pub server: Option<String>,

    /// Upper bound for one apply (e.g. "10m")
    #[arg(long, value_parser = parse_duration)]
    pub apply_timeout: Option<Duration>,

    /// Write Prometheus metrics to this file after every run
    #[arg(long, env = "KAPPLIER_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,
}

impl ConfigArgs {
    /// Overlay the flags that were given onto `config`
    pub fn apply_to(&self, config: &mut ApplierConfig) {
        if let Some(repo_path) = &self.repo_path {
            config.repo_path = repo_path.clone();
        }
        if !self.namespaces.is_empty() {
            config.namespaces = self.namespaces.clone();
        }
        // A flag can only turn dry-run on
        config.dry_run |= self.dry_run;
        if let Some(kubectl) = &self.kubectl {
            config.kubectl = kubectl.clone();
        }
        if let Some(server) = &self.server {
            config.server = Some(server.clone());
        }
        if let Some(timeout) = self.apply_timeout {
            config.apply_timeout = Some(timeout);
        }
        if let Some(metrics_file) = &self.metrics_file {
            config.metrics_file = Some(metrics_file.clone());
        }
    }
}

/// Parse a human-readable duration such as "30s" or "5m"
pub fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

/// Format a duration the way it is written in the config file
pub fn format_duration(duration: Duration) -> String {
    humantime_serde::re::humantime::format_duration(duration).to_string()
}

/// Load the config file (explicit path or default location) and apply
/// command-line overrides
pub fn load_config(path: Option<&Path>, args: &ConfigArgs) -> Result<ApplierConfig> {
    let mut config = match path {
        Some(path) if !path.exists() => {
            return Err(CliError::config_with_help(
                format!("config file {} not found", path.display()),
                "pass an existing file to --config or omit it to use the defaults",
            ));
        }
        Some(path) => ApplierConfig::load_from(path)?,
        None => ApplierConfig::load()?,
    };

    args.apply_to(&mut config);
    config.validate()?;

    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

/// Build the production cluster client.
///
/// With a server configured, a kubeconfig is rendered for it and used by
/// both kubectl and the API client. Otherwise the in-cluster or local
/// default configuration applies.
pub async fn connect(config: &ApplierConfig, reporter: Arc<dyn Reporter>) -> Result<KubectlClient> {
    let mut command = KubectlCommand {
        program: config.kubectl.clone(),
        kubeconfig: None,
        timeout: config.apply_timeout,
    };

    let client = match &config.server {
        Some(server) => {
            let settings = KubeconfigSettings {
                server: server.clone(),
                token_path: config.token_path.clone(),
                template_path: config.kubeconfig_template.clone(),
                output_path: config.kubeconfig_path.clone(),
            };
            let path = write_kubeconfig(&settings)?;
            let client = client_from_kubeconfig(&path).await?;
            command.kubeconfig = Some(path);
            client
        }
        None => kube::Client::try_default().await.map_err(|e| CliError::Cluster {
            message: format!("cannot load cluster configuration: {}", e),
            help: Some("run inside a cluster, set KUBECONFIG, or pass --server".to_string()),
        })?,
    };

    Ok(KubectlClient::new(client, command, reporter))
}

/// Runner wired to the cluster and the given reporter
pub async fn build_runner(
    config: &ApplierConfig,
    reporter: Arc<PrometheusReporter>,
) -> Result<Runner<KubectlClient, Arc<PrometheusReporter>>> {
    let client = connect(config, reporter.clone()).await?;
    let applier = BatchApplier::new(client, reporter).with_dry_run(config.dry_run);
    Ok(Runner::new(applier, &config.repo_path).with_namespaces(config.namespaces.clone()))
}

/// Write the reporter's metrics in text exposition format.
///
/// The file is replaced atomically so a collector never reads a partial
/// write.
pub fn write_metrics(reporter: &PrometheusReporter, path: &Path) -> Result<()> {
    let text = reporter.export()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, text)?;
    std::fs::rename(&tmp, path)?;

    tracing::debug!(path = %path.display(), "wrote metrics");
    Ok(())
}
