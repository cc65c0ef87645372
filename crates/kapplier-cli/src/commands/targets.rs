//! Targets command - list what a run would apply

use kapplier_core::{ApplierConfig, discover_targets};
use miette::IntoDiagnostic;

use crate::display::TargetsDisplay;
use crate::error::Result;

/// Run the targets command
pub fn run(config: &ApplierConfig, output_json: bool) -> Result<()> {
    let targets = discover_targets(&config.repo_path, &config.namespaces)?;

    if output_json {
        let entries: Vec<serde_json::Value> = targets
            .iter()
            .map(|target| {
                serde_json::json!({
                    "path": target.id,
                    "namespace": target.namespace(),
                    "kustomize": target.kustomize,
                })
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries).into_diagnostic()?;
        println!("{}", json);
    } else {
        print!("{}", TargetsDisplay(&targets));
    }

    Ok(())
}
