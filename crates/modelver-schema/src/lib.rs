//! Schema versions and object layouts
//!
//! Read-only description of which object types exist at each schema
//! release and how their positional fields are laid out.
//!
//! # Core Concepts
//!
//! - [`Version`]: a `major.minor.patch` release identifier
//! - [`ObjectSchema`]: the field layout of one object type at one version
//! - [`SchemaAccessor`]: the lookup contract consumed by migration
//! - [`SchemaRegistry`]: an accessor built from a YAML or JSON [`SchemaBundle`]
//! - [`CachedSchema`]: a moka-backed cache in front of any accessor
//!
//! # Example
//!
//! ```rust,ignore
//! use modelver_schema::{SchemaAccessor, SchemaRegistry, Version};
//!
//! let registry = SchemaRegistry::from_yaml_str(&bundle)?;
//! let count = registry.field_count("OS:Boiler:Steam", &Version::new(3, 0, 0))?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod accessor;
mod cache;
mod error;
mod object;
mod registry;
mod version;

pub use accessor::SchemaAccessor;
pub use cache::{CacheStats, CachedSchema};
pub use error::{SchemaError, SchemaResult};
pub use object::ObjectSchema;
pub use registry::{ObjectDef, ReleaseDef, SchemaBundle, SchemaRegistry};
pub use version::Version;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn cached_registry_matches_registry() {
        let yaml = r#"
releases:
  - version: "2.0.0"
    objects:
      OS:Material:
        fields: [Name, Roughness, Thickness]
        choices:
          Roughness: [Rough, Smooth]
"#;
        let registry = SchemaRegistry::from_yaml_str(yaml).unwrap();
        let cached = CachedSchema::new(registry.clone(), 8);
        let v = Version::new(2, 0, 0);

        assert_eq!(
            cached.field_names("OS:Material", &v).unwrap(),
            registry.field_names("OS:Material", &v).unwrap()
        );
        assert_eq!(cached.versions(), registry.versions());
        assert!(cached
            .allowed_values("OS:Material", &v, 1)
            .unwrap()
            .unwrap()
            .contains("Smooth"));
    }

    #[test]
    fn accessor_is_object_safe() {
        let registry = SchemaRegistry::from_bundle(SchemaBundle::default()).unwrap();
        let accessor: std::sync::Arc<dyn SchemaAccessor> = std::sync::Arc::new(registry);
        assert!(accessor.versions().is_empty());
        assert!(!accessor.knows_version(&Version::new(1, 0, 0)));
    }
}
