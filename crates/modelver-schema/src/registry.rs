//! Bundle-backed schema registry
//!
//! A [`SchemaBundle`] lists releases in ascending order. Each release only
//! declares the object types that are new or changed at that version (and
//! those removed), so a lookup walks back to the most recent definition.

use crate::{ObjectSchema, SchemaAccessor, SchemaError, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Serialized form of a schema history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaBundle {
    /// Releases, ascending
    pub releases: Vec<ReleaseDef>,
}

/// Object definitions introduced or changed by one release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseDef {
    /// Release version
    pub version: Version,
    /// New or changed object types, replaced whole
    #[serde(default)]
    pub objects: BTreeMap<String, ObjectDef>,
    /// Object types no longer defined from this release on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
}

/// One object type definition inside a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectDef {
    /// Fixed field names
    pub fields: Vec<String>,
    /// Extensible group field names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensible: Vec<String>,
    /// Allowed values keyed by fixed field name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub choices: BTreeMap<String, Vec<String>>,
}

/// Immutable schema registry built from a [`SchemaBundle`]
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    releases: Vec<Version>,
    // `None` marks a removal at that release
    definitions: BTreeMap<String, BTreeMap<Version, Option<Arc<ObjectSchema>>>>,
}

impl SchemaRegistry {
    /// Build registry from a bundle
    ///
    /// # Errors
    /// Returns [`SchemaError::InvalidBundle`] if releases are not strictly
    /// ascending or a choice key names a field the object does not have
    pub fn from_bundle(bundle: SchemaBundle) -> Result<Self, SchemaError> {
        let mut releases = Vec::with_capacity(bundle.releases.len());
        let mut definitions: BTreeMap<String, BTreeMap<Version, Option<Arc<ObjectSchema>>>> =
            BTreeMap::new();

        for release in bundle.releases {
            if let Some(last) = releases.last() {
                if release.version <= *last {
                    return Err(SchemaError::InvalidBundle(format!(
                        "release {} listed after {last}",
                        release.version
                    )));
                }
            }

            for (object_type, def) in release.objects {
                let schema = build_object(&object_type, def, release.version)?;
                definitions
                    .entry(object_type)
                    .or_default()
                    .insert(release.version, Some(Arc::new(schema)));
            }

            for object_type in release.removed {
                definitions
                    .entry(object_type)
                    .or_default()
                    .insert(release.version, None);
            }

            releases.push(release.version);
        }

        tracing::debug!(
            releases = releases.len(),
            object_types = definitions.len(),
            "schema registry built"
        );

        Ok(Self {
            releases,
            definitions,
        })
    }

    /// Build registry from a YAML bundle
    ///
    /// # Errors
    /// Returns decode errors or bundle validation errors
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        let bundle: SchemaBundle = serde_yaml::from_str(yaml)?;
        Self::from_bundle(bundle)
    }

    /// Build registry from a JSON bundle
    ///
    /// # Errors
    /// Returns decode errors or bundle validation errors
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let bundle: SchemaBundle = serde_json::from_str(json)?;
        Self::from_bundle(bundle)
    }

    /// Object types defined at `version`, sorted by name
    ///
    /// # Errors
    /// Returns [`SchemaError::UnknownVersion`] for an unknown release
    pub fn object_types(&self, version: &Version) -> Result<Vec<&str>, SchemaError> {
        self.check_release(version)?;
        Ok(self
            .definitions
            .iter()
            .filter(|(_, history)| matches!(latest_at(history, version), Some(Some(_))))
            .map(|(name, _)| name.as_str())
            .collect())
    }

    /// Latest release described by the registry
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<Version> {
        self.releases.last().copied()
    }

    /// Number of releases
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    /// Check if registry has no releases
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    fn check_release(&self, version: &Version) -> Result<(), SchemaError> {
        if self.releases.binary_search(version).is_ok() {
            Ok(())
        } else {
            Err(SchemaError::UnknownVersion(*version))
        }
    }
}

impl SchemaAccessor for SchemaRegistry {
    fn versions(&self) -> Vec<Version> {
        self.releases.clone()
    }

    fn object_schema(
        &self,
        object_type: &str,
        version: &Version,
    ) -> Result<Arc<ObjectSchema>, SchemaError> {
        self.check_release(version)?;
        self.definitions
            .get(object_type)
            .and_then(|history| latest_at(history, version))
            .and_then(Option::as_ref)
            .map(Arc::clone)
            .ok_or_else(|| SchemaError::unknown_object_type(object_type, *version))
    }

    fn knows_version(&self, version: &Version) -> bool {
        self.check_release(version).is_ok()
    }
}

fn latest_at<'a>(
    history: &'a BTreeMap<Version, Option<Arc<ObjectSchema>>>,
    version: &Version,
) -> Option<&'a Option<Arc<ObjectSchema>>> {
    history.range(..=*version).next_back().map(|(_, def)| def)
}

fn build_object(
    object_type: &str,
    def: ObjectDef,
    version: Version,
) -> Result<ObjectSchema, SchemaError> {
    let mut schema =
        ObjectSchema::new(object_type, def.fields).with_extensible(def.extensible);
    for (field, values) in def.choices {
        let index = schema.field_index(&field).ok_or_else(|| {
            SchemaError::InvalidBundle(format!(
                "{object_type} at {version}: choices for unknown field '{field}'"
            ))
        })?;
        schema = schema.with_choices(index, values);
    }
    Ok(schema)
}
