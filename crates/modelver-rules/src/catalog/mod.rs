//! Built-in revision catalog
//!
//! Releases 2.4.1 through 3.1.0 with the update rules for the modeled object
//! types, and the schema bundle those rules are written against. Releases
//! that changed none of the modeled types are identity steps.

mod v2_4_2;
mod v2_5_0;
mod v3_0_0;
mod v3_0_1;
mod v3_1_0;

use crate::chain::{ChainError, VersionChain};
use crate::primitives::EnumRemap;
use crate::Revision;
use modelver_schema::{SchemaError, SchemaRegistry, Version};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Schema bundle for the catalog releases
pub const SCHEMA_YAML: &str = include_str!("../../resources/schema.yaml");

/// Supported releases, oldest first
pub const RELEASES: [Version; 19] = [
    Version::new(2, 4, 1),
    Version::new(2, 4, 2),
    Version::new(2, 4, 3),
    Version::new(2, 5, 0),
    Version::new(2, 5, 1),
    Version::new(2, 5, 2),
    Version::new(2, 6, 0),
    Version::new(2, 6, 1),
    Version::new(2, 6, 2),
    Version::new(2, 7, 0),
    Version::new(2, 7, 1),
    Version::new(2, 7, 2),
    Version::new(2, 8, 0),
    Version::new(2, 8, 1),
    Version::new(2, 9, 0),
    Version::new(2, 9, 1),
    Version::new(3, 0, 0),
    Version::new(3, 0, 1),
    Version::new(3, 1, 0),
];

static SCHEMA: Lazy<Result<Arc<SchemaRegistry>, SchemaError>> =
    Lazy::new(|| SchemaRegistry::from_yaml_str(SCHEMA_YAML).map(Arc::new));

/// Registry for the catalog releases, parsed once per process
///
/// # Errors
/// Returns the bundle decode error if the embedded resource is malformed
pub fn builtin_schema() -> Result<Arc<SchemaRegistry>, SchemaError> {
    SCHEMA.clone()
}

/// Version chain over [`RELEASES`] with the catalog rules
///
/// # Errors
/// Returns [`ChainError`] if a rule cannot be constructed or the chain is
/// inconsistent
pub fn builtin_chain() -> Result<VersionChain, ChainError> {
    VersionChain::builder()
        .releases(RELEASES)
        .rule(v2_4_2::rule()?)
        .rule(v2_5_0::rule()?)
        .rule(v3_0_0::rule()?)
        .rule(v3_0_1::rule()?)
        .rule(v3_1_0::rule()?)
        .fill_identity()
        .build()
}

fn step(from: (u32, u32, u32), to: (u32, u32, u32)) -> Revision {
    Revision::new(
        Version::new(from.0, from.1, from.2),
        Version::new(to.0, to.1, to.2),
    )
}

/// Fuel type spellings renamed at 3.0.0
fn fuel_types() -> EnumRemap {
    EnumRemap::new([
        ("FuelOil#1", "FuelOilNo1"),
        ("FuelOil#2", "FuelOilNo2"),
        ("Gas", "NaturalGas"),
        ("PropaneGas", "Propane"),
    ])
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainLookup;
    use modelver_schema::SchemaAccessor;

    #[test]
    fn schema_covers_every_release() {
        let schema = builtin_schema().unwrap();
        assert_eq!(schema.versions(), RELEASES.to_vec());
    }

    #[test]
    fn chain_is_complete_and_matches_schema() {
        let chain = builtin_chain().unwrap();
        let schema = builtin_schema().unwrap();
        chain.validate_against(schema.as_ref()).unwrap();

        assert_eq!(chain.all_versions_in_order(), &RELEASES);
        assert_eq!(chain.len(), RELEASES.len() - 1);
        assert_eq!(chain.latest(), Version::new(3, 1, 0));
        assert!(matches!(
            chain.lookup(&Version::new(3, 1, 0)).unwrap(),
            ChainLookup::Current
        ));
    }

    #[test]
    fn trivial_releases_are_identity() {
        let chain = builtin_chain().unwrap();
        match chain.lookup(&Version::new(2, 7, 0)).unwrap() {
            ChainLookup::Rule(rule) => assert!(rule.handled_types().is_empty()),
            ChainLookup::Current => panic!("2.7.0 is not current"),
        }
    }
}
