use crate::key::Key;
use async_graphql_parser::types as ast;
use std::collections::{BTreeMap, BTreeSet};

/// The target federation specification version. Shapes the synthesized
/// document (see [`synthesize`](crate::synthesize())).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederationVersion {
    V1,
    V2 { minor: u8 },
}

impl FederationVersion {
    /// Accepts `"v1"` and `"v2.<minor>"`. Anything else is unsupported and
    /// fails synthesis before any output is produced.
    pub fn parse(version: &str) -> Result<FederationVersion, String> {
        if version == "v1" {
            return Ok(FederationVersion::V1);
        }

        version
            .strip_prefix("v2.")
            .and_then(|minor| minor.parse().ok())
            .map(|minor| FederationVersion::V2 { minor })
            .ok_or_else(|| format!("unsupported federation version `{version}`"))
    }

    pub(crate) fn link_url(self) -> Option<String> {
        match self {
            FederationVersion::V1 => None,
            FederationVersion::V2 { minor } => Some(format!("https://specs.apollo.dev/federation/v2.{minor}")),
        }
    }
}

/// Orders the declared keys of an entity; the first key of the returned list
/// is the one the synthesized schema exposes.
pub trait KeySelector {
    fn select(&self, keys: Vec<Key>, node: &ast::TypeDefinition) -> Vec<Key>;
}

/// The built-in key selection policy: declaration order wins.
pub struct FirstDeclaredKey;

impl KeySelector for FirstDeclaredKey {
    fn select(&self, keys: Vec<Key>, _node: &ast::TypeDefinition) -> Vec<Key> {
        keys
    }
}

/// Decides whether a candidate entity type is included. Receives the set of
/// already accepted candidates, keyed by type name, so that order-sensitive
/// rules can be expressed.
pub trait EntityQualifier {
    fn qualifies(&self, node: &ast::TypeDefinition, accepted: &BTreeMap<String, ast::TypeDefinition>) -> bool;
}

/// The built-in qualifier: every entity qualifies.
pub struct AcceptAllEntities;

impl EntityQualifier for AcceptAllEntities {
    fn qualifies(&self, _node: &ast::TypeDefinition, _accepted: &BTreeMap<String, ast::TypeDefinition>) -> bool {
        true
    }
}

/// Second-chance qualifier for types the [EntityQualifier] turned down.
/// Receives the final accepted set, so specific types can be rescued without
/// weakening the primary rule.
pub trait OmittedEntityQualifier {
    fn rescues(&self, node: &ast::TypeDefinition, accepted: &BTreeMap<String, ast::TypeDefinition>) -> bool;
}

/// The built-in reconsideration policy: nothing is rescued.
pub struct RescueNone;

impl OmittedEntityQualifier for RescueNone {
    fn rescues(&self, _node: &ast::TypeDefinition, _accepted: &BTreeMap<String, ast::TypeDefinition>) -> bool {
        false
    }
}

/// Options for one synthesis run.
pub struct SynthesisOptions {
    /// Name of the subgraph being generated. A subgraph ingested under this
    /// name is excluded from its own input.
    pub subgraph_name: String,
    /// Type names that must never be treated as entities, even when they
    /// would otherwise qualify.
    pub exceptions: BTreeSet<String>,
    /// Contract tag names attached globally to the lookup machinery.
    pub contract_tags: BTreeSet<String>,
    /// Target federation version string, e.g. `"v2.3"` or `"v1"`.
    pub federation_version: String,
    /// Directive names imported by the v2 `@link` declaration. Must not be
    /// empty.
    pub imports: Vec<String>,
    pub key_selector: Box<dyn KeySelector>,
    pub entity_qualifier: Box<dyn EntityQualifier>,
    pub omitted_entity_qualifier: Box<dyn OmittedEntityQualifier>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        SynthesisOptions {
            subgraph_name: "object-identification".to_owned(),
            exceptions: BTreeSet::new(),
            contract_tags: BTreeSet::new(),
            federation_version: "v2.3".to_owned(),
            imports: ["@key", "@tag", "@external", "@shareable"]
                .into_iter()
                .map(String::from)
                .collect(),
            key_selector: Box::new(FirstDeclaredKey),
            entity_qualifier: Box::new(AcceptAllEntities),
            omitted_entity_qualifier: Box::new(RescueNone),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parsing() {
        assert_eq!(FederationVersion::parse("v1").unwrap(), FederationVersion::V1);
        assert_eq!(
            FederationVersion::parse("v2.3").unwrap(),
            FederationVersion::V2 { minor: 3 }
        );
        assert!(FederationVersion::parse("v3.0").is_err());
        assert!(FederationVersion::parse("2.3").is_err());
        assert!(FederationVersion::parse("").is_err());
    }
}
