//! Kubeconfig generation
//!
//! When the API server cannot be discovered from inside the cluster, an
//! explicit server address is configured. A kubeconfig pointing at it is
//! rendered from a template with the pod's service-account token, written to
//! disk, and used by both kubectl (`--kubeconfig=`) and the API client.

use std::path::{Path, PathBuf};

use minijinja::{Environment, UndefinedBehavior, context};

use crate::error::{KubeError, Result};

/// Template used when no custom template is configured
pub const DEFAULT_TEMPLATE: &str = r#"apiVersion: v1
kind: Config
clusters:
- name: default
  cluster:
    certificate-authority: /var/run/secrets/kubernetes.io/serviceaccount/ca.crt
    server: {{ server }}
contexts:
- name: default
  context:
    cluster: default
    user: kapplier
current-context: default
users:
- name: kapplier
  user:
    token: {{ token }}
"#;

/// Where the kubeconfig comes from and where it goes
#[derive(Debug, Clone)]
pub struct KubeconfigSettings {
    /// API server address
    pub server: String,
    /// Service-account token file
    pub token_path: PathBuf,
    /// Custom template, [`DEFAULT_TEMPLATE`] otherwise
    pub template_path: Option<PathBuf>,
    /// Output file
    pub output_path: PathBuf,
}

/// Render a kubeconfig template. Every variable must be defined.
pub fn render_kubeconfig(template: &str, server: &str, token: &str) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    Ok(env.render_str(template, context! { server => server, token => token })?)
}

/// Render and write the kubeconfig, returning its path
pub fn write_kubeconfig(settings: &KubeconfigSettings) -> Result<PathBuf> {
    let token = std::fs::read_to_string(&settings.token_path).map_err(|e| {
        KubeError::Kubeconfig(format!(
            "cannot read token {}: {}",
            settings.token_path.display(),
            e
        ))
    })?;

    let template = match &settings.template_path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            KubeError::Kubeconfig(format!("cannot read template {}: {}", path.display(), e))
        })?,
        None => DEFAULT_TEMPLATE.to_string(),
    };

    let rendered = render_kubeconfig(&template, &settings.server, token.trim())?;

    if let Some(parent) = settings.output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&settings.output_path, rendered)?;

    tracing::info!(path = %settings.output_path.display(), server = %settings.server, "wrote kubeconfig");
    Ok(settings.output_path.clone())
}

/// Build an API client from a kubeconfig file
pub async fn client_from_kubeconfig(path: &Path) -> Result<kube::Client> {
    let kubeconfig = kube::config::Kubeconfig::read_from(path)
        .map_err(|e| KubeError::Kubeconfig(e.to_string()))?;
    let config = kube::Config::from_custom_kubeconfig(
        kubeconfig,
        &kube::config::KubeConfigOptions::default(),
    )
    .await
    .map_err(|e| KubeError::Kubeconfig(e.to_string()))?;
    Ok(kube::Client::try_from(config)?)
}
