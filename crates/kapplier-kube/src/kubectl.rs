//! Production cluster client
//!
//! Manifests are applied by shelling out to `kubectl apply`, which handles
//! directory recursion, kustomizations and pruning for us. Namespace
//! annotations are read through the Kubernetes API.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kapplier_core::{NamespaceAnnotations, PRUNE_ALLOWLIST};
use kube::api::{Api, ListParams};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::client::{ApplyOutput, ApplyRequest, ClusterClient};
use crate::error::{ApplyError, KubeError, Result};
use crate::metrics::Reporter;

/// How kubectl is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubectlCommand {
    /// kubectl executable
    pub program: String,
    /// Explicit kubeconfig, passed as `--kubeconfig=`
    pub kubeconfig: Option<PathBuf>,
    /// Upper bound for one apply
    pub timeout: Option<Duration>,
}

impl Default for KubectlCommand {
    fn default() -> Self {
        Self {
            program: "kubectl".to_string(),
            kubeconfig: None,
            timeout: None,
        }
    }
}

impl KubectlCommand {
    /// Full argv (program first) for an apply
    pub fn apply_args(&self, request: &ApplyRequest) -> Vec<String> {
        let mut args = vec![
            self.program.clone(),
            "apply".to_string(),
            format!("--server-dry-run={}", request.dry_run),
        ];

        if request.kustomize {
            args.extend(["-k".to_string(), request.path.clone()]);
        } else {
            args.extend(["-R".to_string(), "-f".to_string(), request.path.clone()]);
        }
        args.extend(["-n".to_string(), request.namespace.clone()]);

        if request.prune {
            args.push("--prune".to_string());
            args.push("--all".to_string());
            args.extend(
                PRUNE_ALLOWLIST
                    .iter()
                    .map(|kind| format!("--prune-whitelist={}", kind)),
            );
        }

        if let Some(kubeconfig) = &self.kubeconfig {
            args.push(format!("--kubeconfig={}", kubeconfig.display()));
        }

        args
    }

    /// Run an apply and collect its combined output
    pub async fn run_apply(
        &self,
        request: &ApplyRequest,
    ) -> std::result::Result<ApplyOutput, ApplyError> {
        let args = self.apply_args(request);
        let command = args.join(" ");

        let mut child = tokio::process::Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                ApplyError::new(
                    command.clone(),
                    "",
                    KubeError::Spawn {
                        program: self.program.clone(),
                        source,
                    },
                )
            })?;

        // Streams are drained into buffers owned here so that whatever was
        // written before a timeout is kept
        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();

        let waited = {
            let collect = async {
                let (out, err, status) = tokio::join!(
                    drain(stdout.as_mut(), &mut out_buf),
                    drain(stderr.as_mut(), &mut err_buf),
                    child.wait(),
                );
                out?;
                err?;
                status
            };
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, collect).await.map_err(|_| limit),
                None => Ok(collect.await),
            }
        };

        let mut output = String::from_utf8_lossy(&out_buf).into_owned();
        output.push_str(&String::from_utf8_lossy(&err_buf));

        let status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(ApplyError::new(command, output, KubeError::Io(e))),
            Err(limit) => {
                if let Err(e) = child.start_kill() {
                    tracing::warn!(
                        command = %command,
                        error = %e,
                        "could not kill timed out kubectl"
                    );
                }
                return Err(ApplyError::new(command, output, KubeError::Timeout(limit)));
            }
        };

        if status.success() {
            Ok(ApplyOutput { command, output })
        } else {
            Err(ApplyError::new(
                command,
                output,
                KubeError::Kubectl {
                    code: status.code(),
                },
            ))
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(
    stream: Option<&mut R>,
    buf: &mut Vec<u8>,
) -> io::Result<()> {
    if let Some(stream) = stream {
        stream.read_to_end(buf).await?;
    }
    Ok(())
}

/// Cluster client backed by kubectl and the Kubernetes API
pub struct KubectlClient {
    client: kube::Client,
    command: KubectlCommand,
    reporter: Arc<dyn Reporter>,
}

impl KubectlClient {
    pub fn new(client: kube::Client, command: KubectlCommand, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            client,
            command,
            reporter,
        }
    }

    pub fn command(&self) -> &KubectlCommand {
        &self.command
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }
}

fn annotations_of(namespace: &Namespace) -> NamespaceAnnotations {
    namespace
        .metadata
        .annotations
        .as_ref()
        .map(NamespaceAnnotations::from_map)
        .unwrap_or_default()
}

/// Annotations of the `requested` namespaces found in a cluster-wide listing.
///
/// A requested namespace absent from `items` is reported as not found, which
/// is what looking it up on its own would give.
fn collect_annotations(
    items: &[Namespace],
    requested: &BTreeSet<String>,
) -> Result<BTreeMap<String, NamespaceAnnotations>> {
    let found: BTreeMap<String, NamespaceAnnotations> = items
        .iter()
        .filter_map(|ns| {
            let name = ns.metadata.name.as_ref()?;
            requested
                .contains(name)
                .then(|| (name.clone(), annotations_of(ns)))
        })
        .collect();

    if let Some(missing) = requested.iter().find(|ns| !found.contains_key(*ns)) {
        return Err(KubeError::NamespaceNotFound {
            namespace: missing.clone(),
        });
    }
    Ok(found)
}

#[async_trait]
impl ClusterClient for KubectlClient {
    async fn apply(&self, request: &ApplyRequest) -> std::result::Result<ApplyOutput, ApplyError> {
        let result = self.command.run_apply(request).await;

        match &result {
            Ok(_) => self.reporter.kubectl_exit_code(&request.namespace, 0),
            Err(e) => {
                if let Some(code) = e.source.exit_code() {
                    self.reporter.kubectl_exit_code(&request.namespace, code);
                }
            }
        }

        result
    }

    async fn namespace_annotations(&self, namespace: &str) -> Result<NamespaceAnnotations> {
        match self.namespaces().get(namespace).await {
            Ok(ns) => Ok(annotations_of(&ns)),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Err(KubeError::NamespaceNotFound {
                namespace: namespace.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn namespace_annotations_batch(
        &self,
        namespaces: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, NamespaceAnnotations>> {
        match namespaces.len() {
            0 => Ok(BTreeMap::new()),
            1 => {
                let mut result = BTreeMap::new();
                for namespace in namespaces {
                    let annotations = self.namespace_annotations(namespace).await?;
                    result.insert(namespace.clone(), annotations);
                }
                Ok(result)
            }
            _ => {
                let list = self.namespaces().list(&ListParams::default()).await?;
                collect_annotations(&list.items, namespaces)
            }
        }
    }
}
