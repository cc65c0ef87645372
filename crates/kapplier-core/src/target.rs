//! Apply targets
//!
//! A target names a directory of manifests. The namespace the manifests are
//! applied into (and whose annotations govern the apply) is the last path
//! segment of the identifier, so `"repo/team-a"` applies `repo/team-a` into
//! `team-a`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A directory of manifests applied into a single namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Identifier, also the path handed to the apply tool
    pub id: String,

    /// Whether the directory is a kustomization (`kubectl apply -k`)
    #[serde(default)]
    pub kustomize: bool,
}

impl Target {
    /// Create a plain (non-kustomize) target
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kustomize: false,
        }
    }

    /// Set the overlay mode detected for this target
    pub fn with_kustomize(mut self, kustomize: bool) -> Self {
        self.kustomize = kustomize;
        self
    }

    /// Namespace governing this target: the final path segment of the id
    pub fn namespace(&self) -> &str {
        namespace_of(&self.id)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Namespace of a target identifier: its final path segment
pub fn namespace_of(id: &str) -> &str {
    let trimmed = id.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, last)) => last,
        None => trimmed,
    }
}

/// Unique namespaces referenced by a list of targets
pub fn unique_namespaces(targets: &[Target]) -> BTreeSet<String> {
    targets.iter().map(|t| t.namespace().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_plain_id() {
        assert_eq!(Target::new("team-a").namespace(), "team-a");
    }

    #[test]
    fn test_namespace_strips_prefix() {
        assert_eq!(Target::new("repo/team-a").namespace(), "team-a");
        assert_eq!(Target::new("/src/manifests/team-b").namespace(), "team-b");
    }

    #[test]
    fn test_namespace_ignores_trailing_slash() {
        assert_eq!(Target::new("repo/team-a/").namespace(), "team-a");
    }

    #[test]
    fn test_namespace_of_matches_target() {
        for id in ["team-a", "repo/team-a", "repo/team-a/", "/src/manifests/team-b"] {
            assert_eq!(namespace_of(id), Target::new(id).namespace());
        }
        assert_eq!(namespace_of(""), "");
    }

    #[test]
    fn test_unique_namespaces_dedups_prefixed_targets() {
        let targets = vec![
            Target::new("repo/ns1"),
            Target::new("ns1"),
            Target::new("other/ns2"),
        ];
        let namespaces = unique_namespaces(&targets);
        assert_eq!(namespaces.len(), 2);
        assert!(namespaces.contains("ns1"));
        assert!(namespaces.contains("ns2"));
    }

    #[test]
    fn test_with_kustomize() {
        let target = Target::new("ns").with_kustomize(true);
        assert!(target.kustomize);
        assert_eq!(target.to_string(), "ns");
    }
}
