//! Namespace annotation parsing
//!
//! Namespaces opt in and out of automatic applies through three annotations.
//! Raw values are turned into an [`AnnotationValue`] at the boundary so that
//! an unrecognised value stays visible instead of silently becoming a boolean.

use std::collections::BTreeMap;
use std::fmt;

/// Annotation keys read from the Namespace resource
pub mod keys {
    /// Whether kapplier applies this namespace at all
    pub const ENABLED: &str = "kube-applier.io/enabled";
    /// Force server-side dry-run for this namespace
    pub const DRY_RUN: &str = "kube-applier.io/dry-run";
    /// Delete allow-listed resources missing from the manifests
    pub const PRUNE: &str = "kube-applier.io/prune";
}

/// Typed value of a single boolean-ish annotation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnnotationValue {
    /// Missing or empty
    #[default]
    Unset,
    /// Exactly `"true"`
    True,
    /// Exactly `"false"`
    False,
    /// Any other value, kept verbatim
    Invalid(String),
}

impl AnnotationValue {
    /// Parse a raw annotation value. Matching is exact: no trimming, no case folding.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => Self::Unset,
            Some("true") => Self::True,
            Some("false") => Self::False,
            Some(other) => Self::Invalid(other.to_string()),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    /// Raw textual form, empty for `Unset`
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unset => "",
            Self::True => "true",
            Self::False => "false",
            Self::Invalid(raw) => raw,
        }
    }
}

impl From<&str> for AnnotationValue {
    fn from(raw: &str) -> Self {
        Self::parse(Some(raw))
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "<unset>"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// The kapplier annotations found on one Namespace
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamespaceAnnotations {
    pub enabled: AnnotationValue,
    pub dry_run: AnnotationValue,
    pub prune: AnnotationValue,
}

impl NamespaceAnnotations {
    /// Build from raw strings, empty meaning unset
    pub fn from_raw(enabled: &str, dry_run: &str, prune: &str) -> Self {
        Self {
            enabled: enabled.into(),
            dry_run: dry_run.into(),
            prune: prune.into(),
        }
    }

    /// Extract the kapplier keys from a full annotation map
    pub fn from_map(annotations: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| AnnotationValue::parse(annotations.get(key).map(String::as_str));
        Self {
            enabled: get(keys::ENABLED),
            dry_run: get(keys::DRY_RUN),
            prune: get(keys::PRUNE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recognised_values() {
        assert_eq!(AnnotationValue::parse(None), AnnotationValue::Unset);
        assert_eq!(AnnotationValue::parse(Some("")), AnnotationValue::Unset);
        assert_eq!(AnnotationValue::parse(Some("true")), AnnotationValue::True);
        assert_eq!(AnnotationValue::parse(Some("false")), AnnotationValue::False);
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(
            AnnotationValue::parse(Some("True")),
            AnnotationValue::Invalid("True".to_string())
        );
        assert_eq!(
            AnnotationValue::parse(Some(" true")),
            AnnotationValue::Invalid(" true".to_string())
        );
    }

    #[test]
    fn test_from_map_reads_kapplier_keys() {
        let mut map = BTreeMap::new();
        map.insert(keys::ENABLED.to_string(), "false".to_string());
        map.insert(keys::PRUNE.to_string(), "true".to_string());
        map.insert("unrelated.io/enabled".to_string(), "maybe".to_string());

        let annotations = NamespaceAnnotations::from_map(&map);
        assert_eq!(annotations.enabled, AnnotationValue::False);
        assert_eq!(annotations.dry_run, AnnotationValue::Unset);
        assert_eq!(annotations.prune, AnnotationValue::True);
    }

    #[test]
    fn test_display() {
        assert_eq!(AnnotationValue::Unset.to_string(), "<unset>");
        assert_eq!(AnnotationValue::from("maybe").to_string(), "maybe");
    }
}
