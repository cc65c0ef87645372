//! Target discovery in a manifest repository
//!
//! Every immediate subdirectory of the repository root is one target, named
//! after the namespace it is applied into:
//!
//! ```text
//! manifests/
//! ├── team-a/            -> kubectl apply -R -f manifests/team-a -n team-a
//! │   └── deployment.yaml
//! └── team-b/            -> kubectl apply -k manifests/team-b -n team-b
//!     └── kustomization.yaml
//! ```

use std::path::Path;

use crate::error::{CoreError, Result};
use crate::target::Target;

/// File names marking a directory as a kustomization
pub const KUSTOMIZATION_FILES: &[&str] = &["kustomization.yaml", "kustomization.yml", "Kustomization"];

/// Check whether a directory should be applied with `kubectl apply -k`
pub fn is_kustomization_dir(dir: &Path) -> bool {
    KUSTOMIZATION_FILES
        .iter()
        .any(|name| dir.join(name).is_file())
}

/// Discover targets under `root`, sorted by directory name.
///
/// Hidden directories (`.git`, ...) are ignored. When `namespaces` is not
/// empty, only directories named in it are returned.
pub fn discover_targets(root: &Path, namespaces: &[String]) -> Result<Vec<Target>> {
    if !root.is_dir() {
        return Err(CoreError::RepoNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut targets = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        if !namespaces.is_empty() && !namespaces.iter().any(|ns| ns.as_str() == name) {
            tracing::debug!(directory = %name, "not in namespace filter, ignoring");
            continue;
        }

        let kustomize = is_kustomization_dir(entry.path());
        targets.push(Target::new(entry.path().display().to_string()).with_kustomize(kustomize));
    }

    Ok(targets)
}
