//! Parsing of `kubectl apply` output
//!
//! kubectl prints one line per object, e.g.
//!
//! ```text
//! deployment.apps/web configured
//! service/web unchanged
//! configmap/settings created (server dry run)
//! ```

use serde::Serialize;

/// Action taken on a single object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceResult {
    pub kind: String,
    pub name: String,
    pub action: String,
}

/// Parse apply output into per-object results.
///
/// Lines with fewer than two whitespace-separated fields are dropped. A first
/// field without a `/` yields an empty name.
pub fn parse_apply_output(output: &str) -> Vec<ResourceResult> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let object = fields.next()?;
            let action = fields.next()?;
            let (kind, name) = object.split_once('/').unwrap_or((object, ""));
            Some(ResourceResult {
                kind: kind.to_string(),
                name: name.to_string(),
                action: action.to_string(),
            })
        })
        .collect()
}
