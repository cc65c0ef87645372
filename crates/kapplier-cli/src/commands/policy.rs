//! Policy command - show how namespace annotations resolve

use std::collections::BTreeSet;
use std::sync::Arc;

use kapplier_core::{ApplierConfig, discover_targets, policy, unique_namespaces};
use kapplier_kube::{ClusterClient, PrometheusReporter};
use miette::IntoDiagnostic;

use crate::display::{PoliciesDisplay, PolicyRow};
use crate::error::Result;
use crate::util;

/// Run the policy command.
///
/// Without explicit namespaces, the namespaces of the discovered targets are
/// resolved.
pub async fn run(config: &ApplierConfig, namespaces: &[String], output_json: bool) -> Result<()> {
    let namespaces: BTreeSet<String> = if namespaces.is_empty() {
        unique_namespaces(&discover_targets(&config.repo_path, &config.namespaces)?)
    } else {
        namespaces.iter().cloned().collect()
    };

    // Nothing is applied, the reporter only satisfies the client
    let reporter = Arc::new(PrometheusReporter::new()?);
    let client = util::connect(config, reporter).await?;
    let annotations = client.namespace_annotations_batch(&namespaces).await?;

    let rows: Vec<PolicyRow> = annotations
        .into_iter()
        .map(|(namespace, annotations)| PolicyRow {
            policy: policy::resolve(config.dry_run, &annotations),
            namespace,
            annotations,
        })
        .collect();

    if output_json {
        let entries: Vec<serde_json::Value> = rows.iter().map(PolicyRow::to_json).collect();
        let json = serde_json::to_string_pretty(&entries).into_diagnostic()?;
        println!("{}", json);
    } else {
        print!("{}", PoliciesDisplay(&rows));
    }

    Ok(())
}
